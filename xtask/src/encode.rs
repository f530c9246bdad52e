use crate::{as_i8, ERR, YES};
use dialect_quants::ErrorCollector;
use itertools::izip;
use log::{info, warn};
use memmap2::Mmap;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::{fs::File, path::PathBuf, time::Instant};
use vwb::{decode_tensor, encode_tensor, write_weight_blob_to, TENSOR_HEADER_BYTES};

#[derive(Args, Default)]
pub struct EncodeArgs {
    /// Raw int8 tensors, one byte per element
    #[clap(required = true)]
    inputs: Vec<PathBuf>,
    /// Output weight blob
    #[clap(long, short)]
    output: PathBuf,
    /// Reconstruction error above which an element is reported
    #[clap(long, short, default_value_t = 64)]
    tolerance: u8,
}

impl EncodeArgs {
    pub fn encode(self) {
        let Self {
            inputs,
            output,
            tolerance,
        } = self;

        let time = Instant::now();
        let files = match inputs
            .iter()
            .map(|path| File::open(path).and_then(|f| unsafe { Mmap::map(&f) }))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(files) => files,
            Err(e) => {
                println!("{ERR}{e}");
                return;
            }
        };
        info!("map {} files in {:?}", files.len(), time.elapsed());

        let time = Instant::now();
        let blobs = files
            .par_iter()
            .map(|data| encode_tensor(as_i8(data)))
            .collect::<Vec<_>>();
        info!("encode {} tensors in {:?}", blobs.len(), time.elapsed());

        for (path, data, blob) in izip!(&inputs, &files, &blobs) {
            let data = as_i8(data);
            let restored = match decode_tensor(blob, 0) {
                Ok((restored, _)) => restored,
                Err(e) => {
                    println!("{ERR}{}: {e}", path.display());
                    return;
                }
            };
            let mut ec = ErrorCollector::new(tolerance);
            ec.extend(data.iter().copied().zip(restored));

            let packed = blob.len() - TENSOR_HEADER_BYTES;
            let ratio = if packed == 0 {
                1.
            } else {
                data.len() as f64 / packed as f64
            };
            println!("{YES}{} ({ratio:.2}x) {ec}", path.display());
            if !ec.outliers().is_empty() {
                warn!(
                    "{}: {} elements off by more than {tolerance}",
                    path.display(),
                    ec.outliers().len()
                );
            }
        }

        let time = Instant::now();
        match File::create(&output).and_then(|f| write_weight_blob_to(f, &blobs)) {
            Ok(n) => {
                info!("write {n} bytes in {:?}", time.elapsed());
                println!("{YES}{} tensors -> {}", blobs.len(), output.display())
            }
            Err(e) => println!("{ERR}{}: {e}", output.display()),
        }
    }
}
