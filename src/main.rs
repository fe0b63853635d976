use specroute::cli::run_cli;
use specroute::telemetry;

fn main() -> anyhow::Result<()> {
    telemetry::init_logging()?;
    run_cli()
}
