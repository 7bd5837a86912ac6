use anyhow::Result;

fn main() -> Result<()> {
    partlib_cli::main_entry()
}
