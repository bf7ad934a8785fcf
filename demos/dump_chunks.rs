//! Dump the chunks and nine-patch metadata of a PNG file
use ninepatch_parse::{ChunkType, read_chunks, read_metadata};
use std::env;
use std::fs::File;

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <png-file>", args[0]);
        std::process::exit(1);
    }

    let path = &args[1];
    let mut f = File::open(path).expect("Failed to open file");

    println!("Chunks in {}:", path);
    match read_chunks(&mut f) {
        Ok(chunks) => {
            for chunk in chunks.iter() {
                let known = !matches!(ChunkType::from(chunk.chunk_type), ChunkType::UnknownChunk(_));
                println!("  {} {} bytes{}", chunk.chunk_type, chunk.payload.len(), if known { "" } else { " (unknown)" });
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    let mut f = File::open(path).expect("Failed to open file");
    match read_metadata(&mut f) {
        Ok(meta) => {
            println!("Outline: {:?}", meta.outline);
            println!("Layout bounds: {:?}", meta.layout_bounds);
            if meta.has_patches() {
                println!("x divs: {:?}", meta.x_divs());
                println!("y divs: {:?}", meta.y_divs());
                println!("Padding: {:?}", meta.padding());
                println!("Colors: {:08x?}", meta.colors());
            } else {
                println!("No npTc chunk; stretch regions are drawn in the image border");
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
