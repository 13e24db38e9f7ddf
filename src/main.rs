use ipfs_bootstrap::CmdOptions;
use structopt::StructOpt;

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let opts = CmdOptions::from_args();
    if let Err(e) = ipfs_bootstrap::run(opts).await {
        log::error!("Err: {}", e);
        std::process::exit(1);
    }
}
