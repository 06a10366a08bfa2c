#![allow(dead_code)]

use codec_stream::{BufferKind, BufferLength, FilterOptions};
use simplelog::{Config, LevelFilter, TestLogger};

/// Routes `log` output through the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = TestLogger::init(LevelFilter::Debug, Config::default());
}

/// Deterministic, moderately compressible data: runs of words with a pseudo-random mix.
pub fn sample_data(len: usize) -> Vec<u8> {
    const WORDS: [&[u8]; 6] = [b"alpha ", b"beta ", b"gamma ", b"delta ", b"\x00\x01\x02", b"\n"];
    let mut state = 0x2545_f491_4f6c_dd1du64;
    let mut data = Vec::with_capacity(len + 8);
    while data.len() < len {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        if state % 5 == 0 {
            data.extend_from_slice(&state.to_le_bytes());
        } else {
            data.extend_from_slice(WORDS[(state % WORDS.len() as u64) as usize]);
        }
    }
    data.truncate(len);
    data
}

pub fn buffers(input: usize, output: usize) -> FilterOptions {
    FilterOptions::new()
        .input_buffer_length(BufferLength::Bytes(input))
        .output_buffer_length(BufferLength::Bytes(output))
}

pub fn fixed_buffers(input: usize, output: usize) -> FilterOptions {
    buffers(input, output).buffer_kind(BufferKind::Fixed)
}

/// Splits `data` into consecutive pieces, cycling through `sizes`. Zero sizes yield empty pieces.
pub fn split<'a>(data: &'a [u8], sizes: &[usize]) -> Vec<&'a [u8]> {
    if sizes.iter().all(|size| *size == 0) {
        return vec![data];
    }
    let mut pieces = Vec::new();
    let mut rest = data;
    for size in sizes.iter().cycle() {
        if rest.is_empty() {
            break;
        }
        let (head, tail) = rest.split_at((*size).min(rest.len()));
        pieces.push(head);
        rest = tail;
    }
    pieces
}
