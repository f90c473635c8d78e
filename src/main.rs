fn main() {
    ctr_sampler::cli::run();
}
