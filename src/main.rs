use anyhow::Result;

fn main() -> Result<()> {
    prodsearch::app::run()
}
