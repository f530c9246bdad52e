use crate::{as_u8, ERR, YES};
use log::info;
use memmap2::Mmap;
use std::{
    fs::{self, File},
    path::PathBuf,
    time::Instant,
};
use vwb::WeightBlob;

#[derive(Args, Default)]
pub struct DecodeArgs {
    /// Weight blob to decode
    file: PathBuf,
    /// Output directory for `tensor_NNN.bin` files
    #[clap(long, short)]
    output_dir: Option<PathBuf>,
}

impl DecodeArgs {
    pub fn decode(self) {
        let Self { file, output_dir } = self;
        let output_dir = output_dir.unwrap_or_else(|| PathBuf::from("."));

        let file = match File::open(&file).and_then(|f| unsafe { Mmap::map(&f) }) {
            Ok(file) => file,
            Err(e) => {
                println!("{ERR}{}: {e}", file.display());
                return;
            }
        };
        let blob = match WeightBlob::new(&file) {
            Ok(blob) => blob,
            Err(e) => {
                println!("{ERR}{e}");
                return;
            }
        };

        let time = Instant::now();
        let tensors = blob.decode();
        info!("decode {} tensors in {:?}", tensors.len(), time.elapsed());

        if let Err(e) = fs::create_dir_all(&output_dir) {
            println!("{ERR}{}: {e}", output_dir.display());
            return;
        }
        for (i, tensor) in tensors.iter().enumerate() {
            let path = output_dir.join(format!("tensor_{i:03}.bin"));
            match fs::write(&path, as_u8(tensor)) {
                Ok(()) => println!("{YES}{} ({} elements)", path.display(), tensor.len()),
                Err(e) => {
                    println!("{ERR}{}: {e}", path.display());
                    return;
                }
            }
        }
    }
}
