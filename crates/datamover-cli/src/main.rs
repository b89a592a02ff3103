use datamover_cli::run;

#[tokio::main]
async fn main() {
    std::process::exit(run().await);
}
