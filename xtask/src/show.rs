use crate::{ERR, YES};
use dialect_quants::{BlockDialect, DIALECT_COUNT};
use itertools::Itertools;
use memmap2::Mmap;
use std::{cmp::Reverse, fs::File, path::PathBuf};
use vwb::{
    EncodedTensor, VwbReader, WeightBlob, WeightBlobHeader, ALIGNMENT, BLOCK_SIZE, HEADER_BYTES,
    MAGIC,
};

#[derive(Args, Default)]
pub struct ShowArgs {
    /// Weight blob to show
    file: PathBuf,
}

struct Failed;

impl ShowArgs {
    pub fn show(self) {
        let Some(file_name) = self.file.file_name().and_then(|s| s.to_str()) else {
            println!("{ERR}No file found.");
            return;
        };
        println!(
            "\
+-{0:-<1$}-+
| {file_name} |
+-{0:-<1$}-+
",
            "",
            file_name.len()
        );

        let file = match File::open(&self.file).and_then(|f| unsafe { Mmap::map(&f) }) {
            Ok(file) => file,
            Err(e) => {
                println!("{ERR}{e}");
                return;
            }
        };

        let header = match VwbReader::new(&file).read_header() {
            Ok(header) => header,
            Err(e) => {
                println!("{ERR}{e}");
                return;
            }
        };
        if let Err(Failed) = show_header(&header, file.len()) {
            return;
        }

        match WeightBlob::new(&file) {
            Ok(blob) => show_tensors(&blob.tensors),
            Err(e) => println!("{ERR}{e}"),
        }
        println!();
    }
}

fn show_title(title: &str) {
    println!(
        "\
{title}
{0:=<1$}
",
        "",
        title.len()
    );
}

fn show_header(header: &WeightBlobHeader, len: usize) -> Result<(), Failed> {
    show_title("Header");

    if header.is_magic_correct() {
        println!("{YES}Magic     = {:#010x}", header.magic());
    } else {
        println!("{ERR}Magic     = {:#010x} (expect {MAGIC:#010x})", header.magic());
        return Err(Failed);
    }
    if header.is_block_size_supported() {
        println!("{YES}BlockSize = {}", header.block_size);
    } else {
        println!("{ERR}BlockSize = {} (expect {BLOCK_SIZE})", header.block_size);
        return Err(Failed);
    }
    if header.nbytes() <= len {
        println!("{YES}Payload   = {}", header.payload_size);
    } else {
        println!(
            "{ERR}Payload   = {} (file holds {})",
            header.payload_size,
            len.saturating_sub(HEADER_BYTES)
        );
        return Err(Failed);
    }
    println!("{YES}Reserved  = {}", header.reserved);
    println!();
    Ok(())
}

fn show_tensors(tensors: &[EncodedTensor]) {
    show_title("Tensors");

    let mut offsets = Vec::with_capacity(tensors.len());
    let mut cursor = HEADER_BYTES;
    for t in tensors {
        offsets.push(cursor);
        cursor = (cursor + t.nbytes()).next_multiple_of(ALIGNMENT);
    }
    let Some(&last) = offsets.last() else {
        return;
    };
    let off_width = last.to_string().len() + 1;

    for (i, (t, offset)) in tensors.iter().zip(offsets).enumerate() {
        let exponents = t
            .blocks()
            .iter()
            .map(|b| b.unpack().shared_exponent())
            .minmax()
            .into_option()
            .map_or_else(|| "-".into(), |(min, max)| format!("{min}..={max}"));

        let dialect =
            most_used_dialect(t.blocks()).map_or_else(|| "-".into(), |d| d.to_string());

        println!(
            "{YES}#{i:<3} +{offset:<#0off_width$x} elements = {:<8} blocks = {:<6} exp = {exponents:<6} dialect = {dialect}",
            t.len(),
            t.blocks().len(),
        );
    }
}

/// Ties go to the lower dialect id.
fn most_used_dialect(blocks: &[BlockDialect]) -> Option<usize> {
    if blocks.is_empty() {
        return None;
    }
    let mut counts = [0usize; DIALECT_COUNT];
    for b in blocks {
        counts[b.unpack().dialect_id() as usize] += 1;
    }
    counts.iter().position_min_by_key(|&&c| Reverse(c))
}

#[test]
fn test_most_used_dialect() {
    use dialect_quants::EncodedBlock;

    let blocks = |ids: &[u8]| {
        ids.iter()
            .map(|&d| BlockDialect::pack(&EncodedBlock::new(d, 0, [0; 32]).unwrap()))
            .collect::<Vec<_>>()
    };
    assert_eq!(most_used_dialect(&[]), None);
    assert_eq!(most_used_dialect(&blocks(&[3, 9, 9])), Some(9));
    assert_eq!(most_used_dialect(&blocks(&[12, 5, 12, 5])), Some(5));
    assert_eq!(most_used_dialect(&blocks(&[15, 0])), Some(0));
}
