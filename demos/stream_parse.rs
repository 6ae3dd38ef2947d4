//! Parsing a reader in small chunks.
//!
//! Run with: cargo run --example stream_parse

use csv_stream::{from_reader, Headers, ParseOptions};
use std::error::Error;
use std::io::Cursor;

fn main() -> Result<(), Box<dyn Error>> {
    let input = "city,population,note\r\n\
                 Zürich,421878,\"on the lake\"\r\n\
                 Basel,173863,\"three\r\ncountries\"\r\n\
                 Bern,134794,\r\n";

    // Tiny chunks: quoted line breaks, CRLF and multi-byte characters all
    // end up split between reads, with no effect on the result.
    let options = ParseOptions::new()
        .with_headers(Headers::FirstRow)
        .with_chunk_size(3);
    let parser = from_reader(Cursor::new(input.as_bytes()), options)?;
    println!("Detected row separator: {:?}\n", parser.row_separator());

    for record in parser {
        let record = record?;
        println!(
            "line {}: {} has {} inhabitants ({:?})",
            record.line(),
            record.get_by_header("city").unwrap_or("?"),
            record.get_by_header("population").unwrap_or("?"),
            record.get_by_header("note"),
        );
        println!("  as JSON: {}", serde_json::to_string(&record)?);
    }

    // Errors carry the line they were found on.
    let broken = "a,b\n\"unterminated,c\n";
    let parser = from_reader(Cursor::new(broken.as_bytes()), ParseOptions::new())?;
    for record in parser {
        match record {
            Ok(record) => println!("\nparsed {:?}", record.fields()),
            Err(e) => println!("stopped: {}", e),
        }
    }

    Ok(())
}
