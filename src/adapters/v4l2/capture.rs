use anyhow::{anyhow, Result};
use image::{ImageFormat, RgbImage};
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::Device;

/// Requested capture format for a lane camera.
pub struct CaptureConfig {
    pub camera_path: String,
    pub fourcc: String,
    pub width: u32,
    pub height: u32,
}

/// Opens the camera, grabs one frame and closes it again.
///
/// The first buffers after stream start are often under-exposed, so `warmup` frames are dropped
/// before the one that is kept.
pub fn grab_frame(cfg: &CaptureConfig, warmup: usize) -> Result<RgbImage> {
    let dev = Device::with_path(&cfg.camera_path)?;

    // 1. Format
    let mut fmt = dev.format()?;
    let b = cfg.fourcc.as_bytes();
    if b.len() != 4 {
        return Err(anyhow!("FourCC must be 4 characters, got `{}`", cfg.fourcc));
    }
    fmt.fourcc = v4l::FourCC::new(&[b[0], b[1], b[2], b[3]]);
    fmt.width = cfg.width;
    fmt.height = cfg.height;

    // The driver may adjust to the closest supported values.
    let actual = dev.set_format(&fmt)?;

    // 2. MMAP stream for the duration of this grab
    let mut stream = Stream::with_buffers(&dev, v4l::buffer::Type::VideoCapture, 2)?;
    for _ in 0..warmup {
        stream.next()?;
    }
    let (data, _) = stream.next()?;

    let fcc = actual.fourcc.str().map_err(|_| anyhow!("invalid FourCC"))?;
    tracing::debug!(
        camera = %cfg.camera_path,
        width = actual.width,
        height = actual.height,
        fourcc = fcc,
        "frame grabbed"
    );
    decode(fcc, data, actual.width, actual.height)
}

fn decode(fourcc: &str, data: &[u8], width: u32, height: u32) -> Result<RgbImage> {
    match fourcc {
        // MJPG frames are plain JPEGs
        "MJPG" => Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)?.to_rgb8()),
        "YUYV" => {
            let expected = width as usize * height as usize * 2;
            if data.len() < expected {
                return Err(anyhow!("short YUYV buffer: {} < {expected}", data.len()));
            }
            Ok(yuyv_to_rgb(data, width, height))
        }
        _ => Err(anyhow!("camera format {fourcc} is not supported")),
    }
}

/// YUYV (YUV 4:2:2) to RGB using BT.601 coefficients.
fn yuyv_to_rgb(yuyv: &[u8], w: u32, h: u32) -> RgbImage {
    let mut out = RgbImage::new(w, h);

    // Each 4-byte block [Y0, U, Y1, V] encodes two pixels sharing U and V.
    for (i, chunk) in yuyv.chunks_exact(4).enumerate() {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;

        let pixel_idx = i as u32 * 2;
        let x = pixel_idx % w;
        let y = pixel_idx / w;
        if y >= h {
            break;
        }

        out.put_pixel(x, y, yuv_pixel(chunk[0] as f32, u, v));
        if x + 1 < w {
            out.put_pixel(x + 1, y, yuv_pixel(chunk[2] as f32, u, v));
        }
    }
    out
}

fn yuv_pixel(y: f32, u: f32, v: f32) -> image::Rgb<u8> {
    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
    image::Rgb([r, g, b])
}
