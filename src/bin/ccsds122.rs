//! ccsds122 CLI - encode and decode BMP images with the lossless CCSDS
//! 122.0-B-2 subset codec.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ccsds122::image_io::{load_rgb_bmp, save_rgb_bmp};
use ccsds122::pipeline::{compress, decompress};

/// Lossless CCSDS 122.0-B-2 (integer 5/3 DWT subset) image codec
#[derive(Parser)]
#[command(name = "ccsds122")]
#[command(author = "ccsds122 contributors")]
#[command(version)]
#[command(about = "Encode and decode BMP images with the lossless CCSDS 122.0-B-2 subset codec", long_about = None)]
#[command(after_help = "EXAMPLES:
    ccsds122 compress image.bmp image.c122 --levels 3
    ccsds122 decompress image.c122 image.bmp
    ccsds122 info -i image.c122")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a BMP image into the packetized container format
    #[command(visible_alias = "c")]
    Compress {
        /// Input BMP file path
        input: PathBuf,

        /// Output container file path
        output: PathBuf,

        /// Number of wavelet decomposition levels
        #[arg(short, long, default_value = "1")]
        levels: u8,
    },

    /// Decompress a container file back into a BMP image
    #[command(visible_alias = "d")]
    Decompress {
        /// Input container file path
        input: PathBuf,

        /// Output BMP file path
        output: PathBuf,
    },

    /// Display the global header fields of a container file
    #[command(visible_alias = "i")]
    Info {
        /// Input container file path
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compress { input, output, levels } => compress_file(&input, &output, levels),
        Commands::Decompress { input, output } => decompress_file(&input, &output),
        Commands::Info { input } => show_info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn compress_file(input: &PathBuf, output: &PathBuf, levels: u8) -> Result<(), Box<dyn std::error::Error>> {
    let image = load_rgb_bmp(input.to_str().ok_or("input path is not valid UTF-8")?)?;
    let coded = compress(&image, levels)?;
    std::fs::write(output, &coded)?;
    println!(
        "compressed {}x{} image ({} channel(s)) to {:?} ({} bytes)",
        image.width,
        image.height,
        image.channels(),
        output,
        coded.len()
    );
    Ok(())
}

fn decompress_file(input: &PathBuf, output: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(input)?;
    let image = decompress(&data)?;
    save_rgb_bmp(&image, output.to_str().ok_or("output path is not valid UTF-8")?)?;
    println!(
        "decompressed to {}x{} image ({} channel(s)) at {:?}",
        image.width,
        image.height,
        image.channels(),
        output
    );
    Ok(())
}

fn show_info(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(input)?;
    let (header, _) = ccsds122::container::GlobalHeader::decode(&data)?;
    println!("height:        {}", header.height);
    println!("width:         {}", header.width);
    println!("channels:      {}", header.channels);
    println!("levels:        {}", header.levels);
    println!("padded_height: {}", header.padded_height);
    println!("padded_width:  {}", header.padded_width);
    println!("wavelet:       {:?}", header.wavelet);
    println!("nbp:           {}", header.nbp);
    Ok(())
}
