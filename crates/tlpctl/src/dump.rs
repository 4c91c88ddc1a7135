use std::fmt::Write as _;

use pcie_tlp::{header_type_byte, Completion, TlpType};

/// Classic 16-bytes-per-line hex dump, addresses starting at `base`.
pub fn hexdump(base: u64, bytes: &[u8]) -> String {
    let mut out = String::new();
    for (i, line) in bytes.chunks(16).enumerate() {
        let _ = write!(out, "{:016x}:", base.wrapping_add(i as u64 * 16));
        for byte in line {
            let _ = write!(out, " {byte:02x}");
        }
        for _ in line.len()..16 {
            out.push_str("   ");
        }
        out.push_str("  |");
        out.extend(line.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push_str("|\n");
    }
    out
}

/// Raw words followed by a decode of the header, as far as it goes.
pub fn describe_tlp(words: &[u32]) -> String {
    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        let _ = writeln!(out, "{i:4}: 0x{word:08x}");
    }

    let Some(&word0) = words.first() else {
        out.push_str("(empty)\n");
        return out;
    };
    match TlpType::try_from(header_type_byte(word0)) {
        Ok(ty) if ty.is_completion() => match Completion::parse(words) {
            Ok(cpl) => {
                let _ = writeln!(
                    out,
                    "{ty}: completer {} requester {} tag 0x{:02x} status {:?} byte count {} lower address 0x{:02x} ({} data dwords)",
                    cpl.completer,
                    cpl.requester,
                    cpl.tag,
                    cpl.status,
                    cpl.byte_count,
                    cpl.lower_address,
                    cpl.payload().len()
                );
            }
            Err(err) => {
                let _ = writeln!(out, "{ty}: {err}");
            }
        },
        Ok(ty) => {
            let _ = writeln!(out, "{ty}");
        }
        Err(err) => {
            let _ = writeln!(out, "{err}");
        }
    }
    out
}
