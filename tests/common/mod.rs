#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use tilescope::genomics::TWOBIT_SIGNATURE;

/// Encode `(name, bases)` records as a 2bit container.
///
/// `N`/`n` runs become N blocks, lowercase runs become mask blocks; N
/// positions are packed as `T`.
pub fn twobit(records: &[(&str, &str)], big_endian: bool) -> Vec<u8> {
    let put = |out: &mut Vec<u8>, v: u32| {
        if big_endian {
            out.extend_from_slice(&v.to_be_bytes());
        } else {
            out.extend_from_slice(&v.to_le_bytes());
        }
    };

    let dir_len: usize = records.iter().map(|(name, _)| 1 + name.len() + 4).sum();
    let bodies: Vec<Vec<u8>> = records
        .iter()
        .map(|(_, bases)| record_body(bases.as_bytes(), &put))
        .collect();

    let mut out = Vec::new();
    put(&mut out, TWOBIT_SIGNATURE);
    put(&mut out, 0);
    put(&mut out, records.len() as u32);
    put(&mut out, 0);

    let mut offset = (16 + dir_len) as u32;
    for ((name, _), body) in records.iter().zip(&bodies) {
        out.push(name.len() as u8);
        out.extend_from_slice(name.as_bytes());
        put(&mut out, offset);
        offset += body.len() as u32;
    }
    for body in bodies {
        out.extend_from_slice(&body);
    }
    out
}

fn record_body(bases: &[u8], put: &impl Fn(&mut Vec<u8>, u32)) -> Vec<u8> {
    let n_blocks = runs(bases, |b| b == b'N' || b == b'n');
    let mask_blocks = runs(bases, |b| b.is_ascii_lowercase());

    let mut out = Vec::new();
    put(&mut out, bases.len() as u32);
    for blocks in [&n_blocks, &mask_blocks] {
        put(&mut out, blocks.len() as u32);
        for (start, _) in blocks.iter() {
            put(&mut out, *start);
        }
        for (_, size) in blocks.iter() {
            put(&mut out, *size);
        }
    }
    put(&mut out, 0);
    out.extend(pack(bases));
    out
}

/// 0-based `(start, size)` runs of bases matching `pred`.
fn runs(bases: &[u8], pred: impl Fn(u8) -> bool) -> Vec<(u32, u32)> {
    let mut blocks = Vec::new();
    let mut current: Option<(u32, u32)> = None;
    for (idx, &base) in bases.iter().enumerate() {
        match (pred(base), current.as_mut()) {
            (true, Some((_, size))) => *size += 1,
            (true, None) => current = Some((idx as u32, 1)),
            (false, Some(_)) => blocks.extend(current.take()),
            (false, None) => {}
        }
    }
    blocks.extend(current);
    blocks
}

/// MSB-first 2-bit packing with codes T=0, C=1, A=2, G=3.
pub fn pack(bases: &[u8]) -> Vec<u8> {
    bases
        .chunks(4)
        .map(|chunk| {
            chunk.iter().enumerate().fold(0u8, |byte, (slot, base)| {
                let code = match base.to_ascii_uppercase() {
                    b'C' => 1,
                    b'A' => 2,
                    b'G' => 3,
                    _ => 0,
                };
                byte | (code << (6 - 2 * slot))
            })
        })
        .collect()
}

/// Write `bytes` under the system temp directory and return the path.
pub fn write_temp(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("tilescope-{}-{name}", std::process::id()));
    fs::write(&path, bytes).expect("write temp container");
    path
}

/// Deterministic pseudo-random bases.
pub fn random_bases(len: usize, seed: u64) -> String {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            b"ACGT"[(state >> 62) as usize] as char
        })
        .collect()
}
