use anyhow::Result;

fn main() -> Result<()> {
    luggage_sentry::cli::run()
}
