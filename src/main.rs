fn main() {
    rsync_aligner::cli::run();
}
