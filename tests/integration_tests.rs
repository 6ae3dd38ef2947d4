use csv_stream::{
    from_reader, generate_line, parse_line, parse_str, Encoding, Error, Headers, ParseOptions,
    Parser, Record, RowSeparator, SkipLines, Source, WriteOptions, Writer,
};
use std::cell::Cell;
use std::io::{self, Read};
use std::rc::Rc;
use std::thread;

fn strings(fields: &[&str]) -> Vec<Option<String>> {
    fields.iter().map(|field| Some(field.to_string())).collect()
}

fn lines(records: &[Record]) -> Vec<usize> {
    records.iter().map(Record::line).collect()
}

/// Fails once `limit` bytes have been read.
struct FailingReader {
    data: &'static [u8],
    limit: usize,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.limit == 0 {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection lost"));
        }
        let n = buf.len().min(self.limit).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        self.limit -= n;
        Ok(n)
    }
}

/// Counts the bytes handed out by the wrapped reader.
struct CountingReader<R> {
    inner: R,
    read: Rc<Cell<usize>>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read.set(self.read.get() + n);
        Ok(n)
    }
}

#[test]
fn test_first_row_headers() {
    let options = ParseOptions::new().with_headers(Headers::FirstRow);
    let records = parse_str("id,name,id\n1,Alice,x\n2,Bob\n", options).unwrap();

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| !record.is_header_row()));
    assert_eq!(
        records[0].headers(),
        Some(&strings(&["id", "name", "id"])[..])
    );
    assert_eq!(records[0].get_by_header("id"), Some("1"));
    assert_eq!(records[1].get_by_header("name"), Some("Bob"));
    assert_eq!(lines(&records), vec![2, 3]);

    let map = records[1].to_map();
    assert_eq!(map.keys().collect::<Vec<_>>(), vec!["id", "name"]);
}

#[test]
fn test_return_headers_from_first_row() {
    let options = ParseOptions::new()
        .with_headers(Headers::FirstRow)
        .with_return_headers(true);
    let records = parse_str("a,b\n1,2\n", options).unwrap();

    assert_eq!(records.len(), 2);
    assert!(records[0].is_header_row());
    assert_eq!(records[0].fields(), &strings(&["a", "b"])[..]);
    assert_eq!(records[0].line(), 1);
    assert!(!records[1].is_header_row());
}

#[test]
fn test_preset_headers() {
    let options = ParseOptions::new()
        .with_headers(Headers::List(vec!["x".to_string(), "y".to_string()]))
        .with_return_headers(true)
        .with_unconverted_fields(true);
    let records = parse_str("1,2\n", options).unwrap();

    assert_eq!(records.len(), 2);
    assert!(records[0].is_header_row());
    assert_eq!(records[0].fields(), &strings(&["x", "y"])[..]);
    assert_eq!(records[0].raw_fields(), Some(&[][..]));
    assert_eq!(records[1].get_by_header("y"), Some("2"));
    assert_eq!(records[1].line(), 1);
}

#[test]
fn test_headers_with_empty_input() {
    let options = ParseOptions::new().with_headers(Headers::FirstRow);
    assert!(parse_str("", options).unwrap().is_empty());
}

#[test]
fn test_unconverted_fields() {
    let options = ParseOptions::new().with_unconverted_fields(true);
    let records = parse_str("a,,\"\"\n", options).unwrap();
    assert_eq!(
        records[0].raw_fields(),
        Some(&[Some("a".to_string()), None, Some(String::new())][..])
    );

    let records = parse_str("a\n", ParseOptions::new()).unwrap();
    assert_eq!(records[0].raw_fields(), None);
}

#[test]
fn test_blank_rows() {
    let input = "a\n\nb\n\n\nc\n";
    let records = parse_str(input, ParseOptions::new()).unwrap();
    assert_eq!(records.len(), 6);
    assert!(records[1].is_empty());

    let records = parse_str(input, ParseOptions::new().with_skip_blanks(true)).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(lines(&records), vec![1, 3, 6]);
}

#[test]
fn test_skip_blanks_keeps_empty_quoted_field() {
    let options = ParseOptions::new().with_skip_blanks(true);
    let records = parse_str("\"\"\n\n", options).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].fields(), &[Some(String::new())][..]);
}

#[test]
fn test_error_line_counts_skipped_rows() {
    let options = ParseOptions::new().with_skip_blanks(true);
    let err = parse_str("a\n\n\nb\"c\n", options).unwrap_err();
    assert_eq!(err.to_string(), "Illegal quoting in line 4.");
}

#[test]
fn test_liberal_parsing() {
    let options = ParseOptions::new().with_liberal_parsing(true);
    let records = parse_str("1,\"23\"4,5\na\"b,\"\"\"c\"\n", options).unwrap();
    assert_eq!(records[0].fields(), &strings(&["1", "\"23\"4", "5"])[..]);
    assert_eq!(records[1].fields(), &strings(&["a\"b", "\"c"])[..]);
}

#[test]
fn test_liberal_parsing_still_requires_closing_quote() {
    let options = ParseOptions::new().with_liberal_parsing(true);
    let err = parse_str("a,\"open\n", options).unwrap_err();
    assert_eq!(err.message(), "Unclosed quoted field");
}

#[test]
fn test_tsv() {
    let records = parse_str("a\tb,c\n1\t\"2\t3\"\n", ParseOptions::tsv()).unwrap();
    assert_eq!(records[0].fields(), &strings(&["a", "b,c"])[..]);
    assert_eq!(records[1].fields(), &strings(&["1", "2\t3"])[..]);

    let line = generate_line(["a", "b\tc", "d,e"], &WriteOptions::tsv()).unwrap();
    assert_eq!(line, "a\t\"b\tc\"\td,e\n");
}

#[test]
fn test_multi_character_row_separator_across_chunks() {
    let input = "a,b<EOR>c,d<EOR>";
    for chunk_size in 1..=input.len() {
        let options = ParseOptions::new()
            .with_row_separator(RowSeparator::literal("<EOR>"))
            .with_chunk_size(chunk_size);
        let records: Vec<Record> = from_reader(input.as_bytes(), options)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 2, "chunk size {}", chunk_size);
        assert_eq!(records[1].fields(), &strings(&["c", "d"])[..]);
    }
}

#[test]
fn test_row_separator_introspection() {
    let parser = Parser::new("a\r\nb", ParseOptions::new()).unwrap();
    assert_eq!(parser.row_separator(), "\r\n");
    assert_eq!(parser.lineno(), 0);
    assert_eq!(parser.headers(), None);

    let parser = Parser::new("no breaks", ParseOptions::new()).unwrap();
    assert_eq!(parser.row_separator(), "\n");

    let long = format!("{}\r\nx", "y".repeat(5000));
    let parser = from_reader(long.as_bytes(), ParseOptions::new()).unwrap();
    assert_eq!(parser.row_separator(), "\r\n");
    let records: Vec<Record> = parser.collect::<Result<_, _>>().unwrap();
    assert_eq!(records[0].get(0).map(str::len), Some(5000));
}

#[test]
fn test_invalid_utf8() {
    let input = b"a,b\nc,\xff\n".to_vec();
    let err = Parser::new(input.clone(), ParseOptions::new())
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap_err();
    assert!(err.is_malformed());

    let options = ParseOptions::new()
        .with_row_separator(RowSeparator::literal("\n"))
        .with_chunk_size(2);
    let mut parser = Parser::new(Source::reader(&input[..]), options).unwrap();
    assert!(parser.next().unwrap().is_ok());
    let err = parser.next().unwrap().unwrap_err();
    assert!(matches!(err, Error::InvalidEncoding { line: 2, .. }));
    assert_eq!(
        err.to_string(),
        "Invalid byte sequence in UTF-8 in line 2."
    );
    assert!(parser.next().is_none());
}

#[test]
fn test_io_error_propagates() {
    let reader = FailingReader {
        data: b"a,b\nc,d\n",
        limit: 6,
    };
    let options = ParseOptions::new()
        .with_row_separator(RowSeparator::literal("\n"))
        .with_chunk_size(4);
    let mut parser = from_reader(reader, options).unwrap();
    assert_eq!(
        parser.next().unwrap().unwrap().fields(),
        &strings(&["a", "b"])[..]
    );
    let err = parser.next().unwrap().unwrap_err();
    match err {
        Error::Io(e) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_oversized_field_fails_early_with_skip_lines() {
    let input = format!("\"{}", "x".repeat(400_000));
    let plain = ParseOptions::new()
        .with_row_separator(RowSeparator::literal("\n"))
        .with_field_size_limit(16)
        .with_chunk_size(64);
    let skipping = plain.clone().with_skip_lines(SkipLines::pattern("#"));

    for options in [plain, skipping] {
        let read = Rc::new(Cell::new(0));
        let reader = CountingReader {
            inner: input.as_bytes(),
            read: Rc::clone(&read),
        };
        let err = from_reader(reader, options)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap_err();
        assert_eq!(err.to_string(), "Field size exceeded in line 1.");
        assert!(read.get() <= 16 * 1024, "read {} bytes", read.get());
    }
}

#[test]
fn test_io_error_while_sniffing() {
    let reader = FailingReader {
        data: b"",
        limit: 0,
    };
    let err = from_reader(reader, ParseOptions::new()).err().unwrap();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_chained_sources() {
    let config = ParseOptions::new().build().unwrap();
    let sources = vec![
        Source::from("a,\"b"),
        Source::reader(&b"c\",d\ne,"[..]),
        Source::from(String::from("f\n")),
    ];
    let records: Vec<Record> = Parser::from_sources(sources, config)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(records[0].fields(), &strings(&["a", "bc", "d"])[..]);
    assert_eq!(records[1].fields(), &strings(&["e", "f"])[..]);
}

#[test]
fn test_config_shared_between_threads() {
    let config = ParseOptions::new()
        .with_headers(Headers::FirstRow)
        .build()
        .unwrap();
    let handles: Vec<_> = (0..4)
        .map(|n| {
            let config = config.clone();
            thread::spawn(move || {
                let input = format!("n\n{}\n", n);
                let records: Vec<Record> = Parser::with_config(input, config)
                    .unwrap()
                    .collect::<Result<_, _>>()
                    .unwrap();
                records[0].get_by_header("n").map(str::to_string)
            })
        })
        .collect();
    for (n, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), Some(n.to_string()));
    }
}

#[test]
fn test_encoding_labels() {
    assert_eq!(Encoding::from_label(" UTF-8 ").unwrap(), Encoding::Utf8);
    assert_eq!(Encoding::Utf8.as_str(), "UTF-8");
    let err = Encoding::from_label("ISO-8859-1").unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn test_writer_cases() {
    let options = WriteOptions::new();
    let cases: Vec<(Vec<Option<&str>>, &str)> = vec![
        (vec![Some("\t")], "\t"),
        (vec![Some("foo"), Some("\""), Some("baz")], "foo,\"\"\"\",baz"),
        (vec![Some("foo"), Some("\"\""), Some("baz")], "foo,\"\"\"\"\"\",baz"),
        (vec![Some("foo"), Some("\"bar\""), Some("baz")], "foo,\"\"\"bar\"\"\",baz"),
        (vec![Some("foo"), Some(""), Some("baz")], "foo,\"\",baz"),
        (vec![Some("foo"), Some("\r"), Some("baz")], "foo,\"\r\",baz"),
        (vec![Some("foo"), Some("\r\n\r"), Some("baz")], "foo,\"\r\n\r\",baz"),
        (vec![Some(","), Some(",")], "\",\",\",\""),
        (vec![None, Some("foo"), Some("baz")], ",foo,baz"),
        (vec![Some("foo"), Some("baz"), None], "foo,baz,"),
        (vec![None, None], ","),
        (vec![Some(";"), Some(";")], ";,;"),
    ];
    for (fields, expected) in cases {
        let line = generate_line(&fields, &options).unwrap();
        assert_eq!(line, format!("{}\n", expected), "fields {:?}", fields);
    }
}

#[test]
fn test_writer_separators() {
    let fields = [Some("a"), Some("b"), None, Some("c")];
    let options = WriteOptions::new().with_column_separator(";");
    assert_eq!(generate_line(fields, &options).unwrap(), "a;b;;c\n");
    let options = WriteOptions::new().with_row_separator("\r\n");
    assert_eq!(generate_line(fields, &options).unwrap(), "a,b,,c\r\n");
}

#[test]
fn test_writer_round_trips_parsed_records() {
    let input = "id,note\r\n1,\"multi\r\nline\"\r\n2,\"with \"\"quotes\"\"\"\r\n3,\r\n";
    let options = ParseOptions::new().with_headers(Headers::FirstRow);
    let parser = Parser::new(input, options).unwrap();
    let headers: Vec<String> = vec!["id".to_string(), "note".to_string()];

    let write_options = WriteOptions::new()
        .with_row_separator(parser.row_separator())
        .with_headers(headers)
        .with_write_headers(true);
    let mut writer = Writer::new(Vec::new(), write_options).unwrap();
    for record in parser {
        writer.write(&record.unwrap()).unwrap();
    }
    assert_eq!(writer.lineno(), 4);
    let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    assert_eq!(output, input);
}

#[test]
fn test_serialize_records() {
    let records = parse_str("a,b\n1,\n", ParseOptions::new()).unwrap();
    let json = serde_json::to_string(&records).unwrap();
    assert_eq!(json, r#"[["a","b"],["1",null]]"#);

    let options = ParseOptions::new().with_headers(Headers::FirstRow);
    let record = parse_line("a,b\n1,\n", options.clone()).unwrap().unwrap();
    assert_eq!(record.get_by_header("a"), Some("1"));
    let records = parse_str("a,b\n1,\n", options).unwrap();
    let value = serde_json::to_value(&records[0]).unwrap();
    assert_eq!(value, serde_json::json!({"a": "1", "b": null}));
}
