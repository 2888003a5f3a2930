// Parses a packet program from stdin and prints its tree as JSON.

use ::packet_optimization::front_end::*;

use std::io::Read;

use anyhow::Context;

pub fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut input_string = String::new();
    std::io::stdin()
        .read_to_string(&mut input_string)
        .context("reading stdin")?;

    let program: ast::Program = parse(&input_string).context("syntax error")?;
    let output = serde_json::to_string_pretty(&program)?;

    println!("{output}");
    Ok(())
}
