use std::io::Cursor;

use crate::Error;
use crate::block::{BlockReaderKind, DEFAULT_BLOCK_READER_CLASS};
use crate::codec::{CodecKind, Compression, MakerRegistry};
use crate::config::{ReaderConfig, WriterConfig};
use crate::expression::Expression;
use crate::file::FileHeader;
use crate::filter::{Filter, NumberOp};
use crate::reader::SpreadReader;
use crate::spread::Spread;
use crate::value::Value;
use crate::writer::SpreadWriter;

fn sample_rows(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            let mut fields = vec![
                ("id", Value::from(i as i64)),
                ("name", Value::from(format!("name-{}", i % 7))),
                (
                    "tags",
                    Value::Array((0..i % 3).map(|t| Value::from(t as i32)).collect()),
                ),
            ];
            if i % 2 == 0 {
                fields.push(("even", Value::object([("half", Value::from((i / 2) as i64))])));
            }
            Value::object(fields)
        })
        .collect()
}

fn small_config() -> WriterConfig {
    let mut config = WriterConfig::default();
    config.set_block_size(1024).set_row_group_size(64);
    config
}

fn write_rows(rows: &[Value], config: WriterConfig) -> Vec<u8> {
    let mut writer = SpreadWriter::new(Vec::new(), config).unwrap();
    for row in rows {
        writer.add_row(row).unwrap();
    }
    writer.close().unwrap()
}

fn open(bytes: &[u8], config: ReaderConfig) -> SpreadReader<Cursor<Vec<u8>>> {
    SpreadReader::open_stream(Cursor::new(bytes.to_vec()), bytes.len() as u64, config).unwrap()
}

fn drain(reader: &mut SpreadReader<Cursor<Vec<u8>>>) -> Vec<Value> {
    let mut out = Vec::new();
    while let Some(spread) = reader.next().unwrap() {
        assert_eq!(spread.row_count(), reader.current_row_count());
        out.extend((0..spread.row_count()).map(|r| spread.get_row(r)));
    }
    out
}

fn header_bytes(block_size: i32, name_len: i32, name: &[u8]) -> Vec<u8> {
    let mut out = b"$CLM".to_vec();
    out.extend_from_slice(&block_size.to_be_bytes());
    out.extend_from_slice(&name_len.to_be_bytes());
    out.extend_from_slice(name);
    out
}

fn open_err(bytes: Vec<u8>) -> Error {
    let len = bytes.len() as u64;
    match SpreadReader::open_stream(Cursor::new(bytes), len, ReaderConfig::default()) {
        Ok(_) => panic!("expected the header to be rejected"),
        Err(e) => e,
    }
}

#[test]
fn rows_survive_a_write_and_read() {
    let rows = sample_rows(500);
    let bytes = write_rows(&rows, small_config());
    let mut reader = open(&bytes, ReaderConfig::default());
    assert_eq!(reader.block_size(), 1024);
    assert_eq!(reader.block_reader(), BlockReaderKind::Default);
    assert_eq!(drain(&mut reader), rows);
    assert!(!reader.has_next().unwrap());
}

#[test]
fn blocks_sit_on_slot_boundaries() {
    let rows = sample_rows(300);
    let bytes = write_rows(&rows, small_config());
    let blocks = bytes.len().div_ceil(1024);
    assert!(blocks > 2, "expected several blocks, got {blocks}");
    for slot in 1..blocks {
        let at = slot * 1024;
        let meta_len = u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        assert!(meta_len > 0, "slot {slot} holds no block");
    }
}

#[test]
fn oversized_row_groups_are_split() {
    let rows = sample_rows(400);
    let mut config = small_config();
    config.set_row_group_size(10_000);
    let mut writer = SpreadWriter::new(Vec::new(), config).unwrap();
    let mut spread = Spread::new();
    for row in &rows {
        spread.add_row(row).unwrap();
    }
    writer.write_spread(&spread).unwrap();
    assert!(writer.blocks_written() > 1);
    let bytes = writer.close().unwrap();
    assert_eq!(drain(&mut open(&bytes, ReaderConfig::default())), rows);
}

#[test]
fn a_row_larger_than_a_block_is_rejected() {
    let mut config = WriterConfig::default();
    config.set_block_size(256).set_row_group_size(1);
    let mut writer = SpreadWriter::new(Vec::new(), config).unwrap();
    let row = Value::object([("blob", Value::from("x".repeat(1_000)))]);
    let err = writer.add_row(&row).unwrap_err();
    assert!(matches!(err, Error::Encode(_)), "{err:?}");
}

#[test]
fn writer_rejects_tiny_blocks() {
    let mut config = WriterConfig::default();
    config.set_block_size(10);
    let err = SpreadWriter::new(Vec::new(), config).err().unwrap();
    assert_eq!(err, Error::Other("block size 10 out of range".to_string()));
}

#[test]
fn empty_file_has_no_blocks() {
    let bytes = write_rows(&[], small_config());
    assert_eq!(bytes.len(), FileHeader::new(1024, "default").encoded_len());
    let mut reader = open(&bytes, ReaderConfig::default());
    assert!(!reader.has_next().unwrap());
    assert!(reader.next().unwrap().is_none());
}

#[test]
fn split_byte_ranges_read_every_row_once() {
    let rows = sample_rows(700);
    let bytes = write_rows(&rows, small_config());
    let len = bytes.len() as u64;
    let half = len / 2;

    let mut first = SpreadReader::open_stream_range(
        Cursor::new(bytes.clone()),
        len,
        ReaderConfig::default(),
        0,
        half,
    )
    .unwrap();
    let mut second = SpreadReader::open_stream_range(
        Cursor::new(bytes.clone()),
        len,
        ReaderConfig::default(),
        half,
        len - half,
    )
    .unwrap();
    let mut got = drain(&mut first);
    let tail = drain(&mut second);
    assert!(!got.is_empty());
    assert!(!tail.is_empty());
    got.extend(tail);
    assert_eq!(got, rows);
}

#[test]
fn queued_ranges_are_read_in_order() {
    let rows = sample_rows(700);
    let bytes = write_rows(&rows, small_config());
    let len = bytes.len() as u64;
    let third = len / 3;
    let mut reader = SpreadReader::open_stream_range(
        Cursor::new(bytes),
        len,
        ReaderConfig::default(),
        0,
        third,
    )
    .unwrap();
    reader.add_range(third, third);
    reader.add_range(2 * third, len - 2 * third);
    assert_eq!(drain(&mut reader), rows);
}

#[test]
fn block_skip_index_prunes_unmatched_blocks() {
    let rows = sample_rows(600);
    let bytes = write_rows(&rows, small_config());
    let expr = Expression::column("id", Filter::number(NumberOp::Equal, 321i64));

    let mut config = ReaderConfig::default();
    config.set_block_skip_index(expr.clone());
    let mut reader = open(&bytes, config);
    let mut read = 0;
    let mut hits = Vec::new();
    while let Some(spread) = reader.next().unwrap() {
        read += spread.row_count();
        for row in spread.filter_rows(&expr).unwrap() {
            hits.push(spread.get_row(row));
        }
    }
    assert_eq!(hits, vec![rows[321].clone()]);
    assert!(read < rows.len(), "no block was skipped");

    // Headers of skipped blocks still feed the file-wide index.
    let mut full = open(&bytes, ReaderConfig::default());
    drain(&mut full);
    assert_eq!(reader.block_index(), full.block_index());
}

#[test]
fn not_expressions_never_skip_blocks() {
    let rows = sample_rows(300);
    let bytes = write_rows(&rows, small_config());
    let mut config = ReaderConfig::default();
    config.set_block_skip_index(Expression::not(Expression::column(
        "id",
        Filter::number(NumberOp::Equal, 3i64),
    )));
    assert_eq!(drain(&mut open(&bytes, config)).len(), rows.len());
}

#[test]
fn writer_and_reader_build_the_same_index() {
    let rows = sample_rows(250);
    let mut writer = SpreadWriter::new(Vec::new(), small_config()).unwrap();
    for row in &rows {
        writer.add_row(row).unwrap();
    }
    writer.flush().unwrap();
    let written = writer.block_index().clone();
    let bytes = writer.close().unwrap();
    let mut reader = open(&bytes, ReaderConfig::default());
    drain(&mut reader);
    assert_eq!(reader.block_index(), &written);
    assert!(written.child("even").and_then(|n| n.child("half")).is_some());
}

#[test]
fn union_member_paths_keep_their_blocks() {
    let rows = vec![
        Value::object([("u", Value::from("x"))]),
        Value::object([("u", Value::from(5i64))]),
    ];
    let bytes = write_rows(&rows, small_config());
    let expr = Expression::leaf(["u", "LONG"], Filter::number(NumberOp::Equal, 5i64));

    let mut reader = open(&bytes, ReaderConfig::default());
    let spread = reader.next().unwrap().unwrap();
    assert_eq!(spread.filter_rows(&expr).unwrap(), vec![1]);

    let mut config = ReaderConfig::default();
    config.set_block_skip_index(expr.clone());
    let mut reader = open(&bytes, config);
    let spread = reader.next().unwrap().expect("block holding the match was skipped");
    assert_eq!(spread.filter_rows(&expr).unwrap(), vec![1]);
    assert!(reader.next().unwrap().is_none());
}

#[test]
fn raw_blocks_decode_to_the_same_rows() {
    let rows = sample_rows(120);
    let bytes = write_rows(&rows, small_config());
    let registry = MakerRegistry::default();
    let mut reader = open(&bytes, ReaderConfig::default());
    let mut got = Vec::new();
    let mut ids = Vec::new();
    while let Some(columns) = reader.next_raw().unwrap() {
        ids.push(reader.current_block_id().unwrap());
        let mut spread = Spread::new();
        for binary in &columns {
            assert!(!binary.payload.is_empty() || binary.codec == CodecKind::Unsupported);
            spread.add_column(registry.to_column(binary).unwrap()).unwrap();
        }
        spread.set_row_count(reader.current_row_count());
        got.extend((0..spread.row_count()).map(|r| spread.get_row(r)));
    }
    assert_eq!(got, rows);
    assert_eq!(ids.first(), Some(&0));
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn closed_reader_reports_no_more_blocks() {
    let bytes = write_rows(&sample_rows(200), small_config());
    let mut reader = open(&bytes, ReaderConfig::default());
    assert!(reader.next().unwrap().is_some());
    reader.close();
    assert!(!reader.has_next().unwrap());
    assert!(reader.into_inner().is_none());
}

#[test]
fn header_round_trips_utf16_names() {
    let header = FileHeader::new(4096, DEFAULT_BLOCK_READER_CLASS);
    let bytes = header.encode().unwrap();
    assert_eq!(&bytes[0..4], b"$CLM");
    assert_eq!(bytes.len(), header.encoded_len());
    let back = FileHeader::read_from(&mut Cursor::new(&bytes), bytes.len() as u64).unwrap();
    assert_eq!(back, header);
}

#[test]
fn long_block_reader_name_resolves() {
    let mut config = small_config();
    config.set_block_reader_name(DEFAULT_BLOCK_READER_CLASS);
    let rows = sample_rows(10);
    let bytes = write_rows(&rows, config);
    let mut reader = open(&bytes, ReaderConfig::default());
    assert_eq!(reader.block_reader_name(), DEFAULT_BLOCK_READER_CLASS);
    assert_eq!(drain(&mut reader), rows);
}

#[test]
fn bad_magic_is_rejected() {
    let mut bytes = header_bytes(1024, 0, &[]);
    bytes[0] = b'X';
    assert_eq!(open_err(bytes), Error::Format("bad file magic".to_string()));
}

#[test]
fn truncated_header_is_rejected() {
    let err = open_err(b"$CLM\0\0".to_vec());
    assert!(matches!(err, Error::Format(_)), "{err:?}");

    let err = open_err(header_bytes(1024, 8, &[0, b'a']));
    assert_eq!(err, Error::Format("truncated file header".to_string()));
}

#[test]
fn invalid_header_fields_are_rejected() {
    assert_eq!(
        open_err(header_bytes(0, 0, &[])),
        Error::Format("invalid block size: 0".to_string())
    );
    assert_eq!(
        open_err(header_bytes(1024, 3, &[0, b'a', 0])),
        Error::Format("invalid block reader name length: 3".to_string())
    );
    assert_eq!(
        open_err(header_bytes(1024, -2, &[])),
        Error::Format("invalid block reader name length: -2".to_string())
    );
    assert_eq!(
        open_err(header_bytes(16, 20, &[0; 20])),
        Error::Format("header of 32 bytes exceeds block size 16".to_string())
    );
    assert_eq!(
        open_err(header_bytes(1024, 2, &[0xDC, 0x00])),
        Error::Format("block reader name is not valid UTF-16".to_string())
    );
}

#[test]
fn unknown_block_reader_needs_an_override() {
    let name: Vec<u8> = "x".encode_utf16().flat_map(u16::to_be_bytes).collect();
    let mut bytes = header_bytes(1024, name.len() as i32, &name);
    assert_eq!(
        open_err(bytes.clone()),
        Error::Format("unknown block reader: x".to_string())
    );

    bytes.resize(1024, 0);
    let mut config = ReaderConfig::default();
    config.set_block_reader_override("default");
    let mut reader = open(&bytes, config);
    assert!(!reader.has_next().unwrap());
}

#[test]
fn unknown_codec_id_in_a_block_is_reported() {
    let mut bytes = write_rows(&sample_rows(10), small_config());
    let header_len = FileHeader::new(1024, "default").encoded_len();
    // meta_len, row_count, column_count, then the "id" column's name and type.
    let codec_at = header_len + 4 + 4 + 4 + 2 + 2 + 1;
    bytes[codec_at..codec_at + 2].copy_from_slice(&99u16.to_be_bytes());
    let mut reader = open(&bytes, ReaderConfig::default());
    assert_eq!(
        reader.next().unwrap_err(),
        Error::UnsupportedCodec("unknown codec id: 99".to_string())
    );
}

#[test]
fn block_meta_overrunning_its_slot_is_rejected() {
    let mut bytes = write_rows(&sample_rows(10), small_config());
    let header_len = FileHeader::new(1024, "default").encoded_len();
    bytes[header_len..header_len + 4].copy_from_slice(&5_000u32.to_be_bytes());
    let mut reader = open(&bytes, ReaderConfig::default());
    assert_eq!(
        reader.next().unwrap_err(),
        Error::Format("block 0 meta of 5000 bytes overruns its slot".to_string())
    );
}

#[cfg(feature = "compression-zstd")]
#[test]
fn zstd_payloads_round_trip() {
    let rows = sample_rows(300);
    let mut config = small_config();
    config.set_compression(Compression::Zstd { level: 3 });
    let bytes = write_rows(&rows, config);
    assert_eq!(drain(&mut open(&bytes, ReaderConfig::default())), rows);
}

#[cfg(feature = "compression-gzip")]
#[test]
fn gzip_payloads_round_trip() {
    let rows = sample_rows(300);
    let mut config = small_config();
    config.set_compression(Compression::Gzip { level: 6 });
    let bytes = write_rows(&rows, config);
    assert_eq!(drain(&mut open(&bytes, ReaderConfig::default())), rows);
}

#[cfg(not(feature = "compression-gzip"))]
#[test]
fn gzip_without_the_feature_is_unsupported() {
    let mut config = small_config();
    config.set_compression(Compression::Gzip { level: 6 });
    let mut writer = SpreadWriter::new(Vec::new(), config).unwrap();
    writer.add_row(&sample_rows(1)[0]).unwrap();
    let err = writer.flush().unwrap_err();
    assert_eq!(
        err,
        Error::UnsupportedCodec("gzip compression feature not enabled".to_string())
    );
}
