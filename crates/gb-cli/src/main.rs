use tracing_subscriber::filter::EnvFilter;

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    std::process::exit(gb_cli::run_cli_from_args(std::env::args_os()));
}
