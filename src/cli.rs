use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use log::{error, info};

use crate::counter_store::CounterStore;
use crate::error::{CtrError, CtrResult};
use crate::processor::CountersProcessor;
use crate::server::Router;
use crate::sled_table::SledTable;
use crate::table::{CounterTable, MemoryTable};

pub const TABLE_ENV_VAR: &str = "COUNTERS_TABLE";

#[derive(Parser, Debug)]
#[command(
    name = "ctr-sampler",
    version = "1.0.0",
    about = "View/click counters with Thompson-sampled CTR ranking over HTTP."
)]
pub struct Cli {
    /// Name of the counters table
    #[arg(long, env = TABLE_ENV_VAR)]
    pub table: Option<String>,
    /// Bind the HTTP server to this port
    #[arg(short, long, default_value = "80")]
    pub port: u16,
    /// Bind the HTTP server to this address
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,
    /// Storage backend for counter rows
    #[arg(long, value_enum, default_value = "sled")]
    pub backend: Backend,
    /// Directory for the sled backend
    #[arg(long, default_value = "./counters-data")]
    pub data_dir: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// In-process table, lost on exit
    Memory,
    /// Embedded sled database under --data-dir
    Sled,
}

impl Cli {
    /// The configured table name; missing or blank is a startup error.
    pub fn table_name(&self) -> CtrResult<&str> {
        match self.table.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(CtrError::Config(format!(
                "env variable {:?} is mandatory",
                TABLE_ENV_VAR
            ))),
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn open_table(&self) -> CtrResult<Arc<dyn CounterTable>> {
        let name = self.table_name()?;
        let table: Arc<dyn CounterTable> = match self.backend {
            Backend::Memory => Arc::new(MemoryTable::new(name)),
            Backend::Sled => Arc::new(SledTable::open(&self.data_dir, name)?),
        };
        Ok(table)
    }
}

pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    if let Err(err) = serve(cli) {
        error!("{}", err);
        std::process::exit(1);
    }
}

fn serve(cli: Cli) -> CtrResult<()> {
    let table = cli.open_table()?;
    let store = CounterStore::new(table);
    info!("using {:?} backend, table {:?}", cli.backend, store.table_name());
    let router = Router::new(Arc::new(CountersProcessor::new(store)));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let (addr, server) = warp::serve(router.routes())
            .try_bind_with_graceful_shutdown(cli.listen_addr(), shutdown_signal())
            .map_err(|err| {
                CtrError::Config(format!("cannot bind {}: {}", cli.listen_addr(), err))
            })?;
        info!("listening on {}", addr);
        server.await;
        info!("server stopped");
        Ok::<(), CtrError>(())
    })
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(err) => {
                error!("cannot install SIGTERM handler: {}", err);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("shutdown signal received");
}
