//! Customizing parsing and writing with ParseOptions and WriteOptions.
//!
//! Run with: cargo run --example custom_options

use csv_stream::{
    generate_line, parse_str, Headers, ParseOptions, RowSeparator, SkipLines, WriteOptions,
    Writer,
};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    // Semicolons, a multi-character row separator and comment lines
    println!("Custom separators, skipped comments:");
    let input = "# exported 2024-01-01<EOR>id;label<EOR>1;\"a;b\"<EOR># trailing note<EOR>2;c<EOR>";
    let options = ParseOptions::new()
        .with_column_separator(";")
        .with_row_separator(RowSeparator::literal("<EOR>"))
        .with_skip_lines(SkipLines::pattern("#"))
        .with_headers(Headers::FirstRow);
    for record in parse_str(input, options)? {
        println!("  line {}: {:?}", record.line(), record.to_map());
    }

    // Quoting disabled: quotes are ordinary characters
    println!("\nQuoting disabled:");
    let options = ParseOptions::new().without_quoting();
    for record in parse_str("5'10\",6'2\"\n", options)? {
        println!("  {:?}", record.fields());
    }

    // Liberal parsing keeps stray quotes instead of failing
    println!("\nLiberal parsing:");
    let strict = parse_str("1,\"23\"4,5\n", ParseOptions::new());
    println!("  strict:  {}", strict.err().map(|e| e.to_string()).unwrap_or_default());
    let liberal = parse_str("1,\"23\"4,5\n", ParseOptions::new().with_liberal_parsing(true))?;
    println!("  liberal: {:?}", liberal[0].fields());

    // Field size limits stop oversized fields early
    println!("\nField size limit:");
    let options = ParseOptions::new().with_max_field_size(8);
    match parse_str("short,\"much too long for the limit\"\n", options) {
        Ok(records) => println!("  parsed {} records", records.len()),
        Err(e) => println!("  {}", e),
    }

    // Writing: tabs, CRLF, forced quotes
    println!("\nWriting:");
    let fields = [Some("plain"), Some("tab\there"), None, Some("")];
    print!("  tsv:    {}", generate_line(fields, &WriteOptions::tsv())?);
    let forced = WriteOptions::new().with_force_quotes(true);
    print!("  forced: {}", generate_line(fields, &forced)?);

    let options = WriteOptions::new()
        .with_row_separator("\r\n")
        .with_headers(vec!["id".to_string(), "label".to_string()])
        .with_write_headers(true);
    let mut writer = Writer::new(Vec::new(), options)?;
    writer.write_record(["1", "a;b"])?;
    writer.write_record(["2", "line\nbreak"])?;
    let output = String::from_utf8(writer.into_inner()?)?;
    println!("  writer: {:?}", output);

    Ok(())
}
