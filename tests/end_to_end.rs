use std::io::{Cursor, Write};
use std::sync::Arc;

use bleper::config::{BitmapArgs, DumpOptions, PeripheralConfig, ServiceIds};
use bleper::{
    BitmapHeader, BitmapLayout, BitOrder, DecodeError, Peripheral, Screen, TransformSettings,
    Upload, handle_upload, render, unpack,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tokio::io::BufReader;

fn header_buffer(width: u16, height: u16, stride: u16, flags: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = b"BMP1".to_vec();
    buf.extend_from_slice(&width.to_le_bytes());
    buf.extend_from_slice(&height.to_le_bytes());
    buf.extend_from_slice(&stride.to_le_bytes());
    buf.push(flags);
    buf.push(0);
    buf.extend_from_slice(payload);
    buf
}

#[test]
fn header_stream_renders_alternating_row() {
    let buf = header_buffer(8, 1, 1, 0x00, &[0xAA]);
    let (header, payload) = BitmapHeader::decode(&buf).unwrap();
    assert_eq!(header.bit_order, BitOrder::MsbFirst);
    let grid = unpack(payload, &header.layout()).unwrap();
    assert_eq!(render(&grid, "#", ".").unwrap(), "#.#.#.#.");
}

#[test]
fn header_flags_drive_bit_order_and_polarity() {
    // LSB-first + invert: 0xAA read low bit first is .#.#.#.#, inverted #.#.#.#.
    let buf = header_buffer(8, 1, 1, 0x03, &[0xAA]);
    let (header, payload) = BitmapHeader::decode(&buf).unwrap();
    let grid = unpack(payload, &header.layout()).unwrap();
    assert_eq!(render(&grid, "#", ".").unwrap(), "#.#.#.#.");
}

#[test]
fn padded_rows_from_header() {
    let buf = header_buffer(4, 2, 2, 0x00, &[0x90, 0xFF, 0x60, 0xFF]);
    let (header, payload) = BitmapHeader::decode(&buf).unwrap();
    let grid = unpack(payload, &header.layout()).unwrap();
    assert_eq!(render(&grid, "X", " ").unwrap(), "X  X\n XX ");
}

#[test]
fn short_header_payload_is_a_format_error() {
    let buf = header_buffer(16, 2, 2, 0x00, &[0, 0, 0]);
    let (header, payload) = BitmapHeader::decode(&buf).unwrap();
    assert!(matches!(
        unpack(payload, &header.layout()),
        Err(bleper::FormatError::PayloadTooShort {
            expected: 4,
            received: 3
        })
    ));
    let layout = BitmapLayout::packed(16, 2);
    assert!(unpack(&[0, 0, 0, 0], &layout).is_ok());
}

fn peripheral(bitmap: BitmapArgs) -> Peripheral {
    let config = PeripheralConfig::new(
        ServiceIds::default(),
        DumpOptions::default(),
        &bitmap,
        "#",
        ".",
    )
    .unwrap();
    Peripheral::from_config(config)
}

#[tokio::test]
async fn peripheral_replays_writes_from_a_file() {
    let mut input = tempfile::NamedTempFile::new().unwrap();
    writeln!(input, "# header-mode session").unwrap();
    writeln!(input, "FFF2 {} phone-1", hex::encode(header_buffer(8, 1, 1, 0, &[0xAA]))).unwrap();
    writeln!(input, "FFF2 424d50").unwrap();
    writeln!(input, "not-hex zz").unwrap();
    writeln!(input, "fff1 4e455854").unwrap();
    input.flush().unwrap();

    let mut p = peripheral(BitmapArgs {
        header: true,
        ..Default::default()
    });
    let file = tokio::fs::File::open(input.path()).await.unwrap();
    let mut out = Vec::new();
    p.drive(BufReader::new(file), &mut out, std::future::pending())
        .await
        .unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("from central=phone-1 char=FFF2 channel=data len=13"));
    assert!(text.contains("from central=? char=fff1 channel=cmd len=4"));
    assert!(text.contains("bitmap-header: 8x1 row_bytes=1 msb_first=true invert=false"));
    assert!(text.contains("bitmap:\n#.#.#.#."));
    assert!(text.contains("utf8: NEXT"));
    assert_eq!(p.dispatcher().writes(), 3);
}

#[tokio::test]
async fn peripheral_stops_on_shutdown() {
    let mut p = peripheral(BitmapArgs {
        size: Some("8x1".into()),
        ..Default::default()
    });
    let (_writer, reader) = tokio::io::duplex(64);
    let mut out = Vec::new();
    p.drive(BufReader::new(reader), &mut out, async {})
        .await
        .unwrap();
    assert_eq!(p.dispatcher().writes(), 0);
    assert_eq!(p.state(), bleper::peripheral::LinkState::Advertising);
}

fn png(w: u32, h: u32, colour: [u8; 3]) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(colour)))
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[test]
fn non_image_upload_keeps_previous_frame() {
    let screen = Screen::new(TransformSettings {
        width: 48,
        height: 80,
        threshold: 128,
        invert: false,
    })
    .unwrap();

    let outcome = handle_upload(&screen, Upload::raw(png(640, 480, [250, 250, 250]), Some("image/png")))
        .unwrap();
    assert_eq!((outcome.src_width, outcome.src_height), (640, 480));
    let before = screen.frames.meta().bytes;

    let err = handle_upload(&screen, Upload::raw(b"GIF89a-but-not-really".to_vec(), None))
        .unwrap_err();
    assert!(matches!(err, DecodeError::Image(_)));
    assert_eq!(screen.frames.meta().bytes, before);
}

#[test]
fn uploads_from_many_threads_leave_a_consistent_frame() {
    let screen = Arc::new(
        Screen::new(TransformSettings {
            width: 16,
            height: 16,
            threshold: 100,
            invert: false,
        })
        .unwrap(),
    );

    let handles: Vec<_> = (0..4u8)
        .map(|i| {
            let screen = Arc::clone(&screen);
            std::thread::spawn(move || {
                let level = i * 60;
                handle_upload(&screen, Upload::raw(png(10 + i as u32, 10, [level; 3]), None))
                    .unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let frame = screen.frames.snapshot();
    assert_eq!(frame.meta.generation, 4);
    assert_eq!(frame.meta.bytes, frame.png.len());
    let decoded = image::load_from_memory(&frame.png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (16, 16));
}
