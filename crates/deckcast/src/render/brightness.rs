use image::RgbaImage;

/// Header/footer text tone derived from the slide image behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextTone {
    /// Dark text on a bright image.
    #[default]
    Dark,
    /// Light text on a dark image.
    Light,
}

const BAND_FRACTION: f32 = 0.15;
const LUMA_THRESHOLD: f32 = 128.0;

/// Sample the top and bottom bands of the image (where the header and
/// footer sit) and pick the readable tone.
pub fn tone_for_image(image: &RgbaImage) -> TextTone {
    let height = image.height();
    if height == 0 || image.width() == 0 {
        return TextTone::Dark;
    }
    let band = ((height as f32 * BAND_FRACTION) as u32).max(1);

    let top = band_luma(image, 0, band);
    let bottom = band_luma(image, height.saturating_sub(band), height);
    let avg = (top + bottom) / 2.0;

    if avg < LUMA_THRESHOLD {
        TextTone::Light
    } else {
        TextTone::Dark
    }
}

/// Average perceptual luma over rows `[from, to)`.
fn band_luma(image: &RgbaImage, from: u32, to: u32) -> f32 {
    let mut sum = 0.0f64;
    let mut count = 0u64;
    for y in from..to.min(image.height()) {
        for x in 0..image.width() {
            let p = image.get_pixel(x, y).0;
            let luma =
                (f64::from(p[0]) * 299.0 + f64::from(p[1]) * 587.0 + f64::from(p[2]) * 114.0)
                    / 1000.0;
            sum += luma;
            count += 1;
        }
    }
    if count == 0 {
        return 255.0;
    }
    (sum / count as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([rgb[0], rgb[1], rgb[2], 255]))
    }

    #[test]
    fn test_dark_image_gets_light_text() {
        assert_eq!(tone_for_image(&solid(64, 64, [10, 10, 10])), TextTone::Light);
    }

    #[test]
    fn test_bright_image_gets_dark_text() {
        assert_eq!(tone_for_image(&solid(64, 64, [240, 240, 240])), TextTone::Dark);
    }

    #[test]
    fn test_bands_ignore_middle() {
        // Bright top and bottom bands, black middle: the middle must not
        // drag the tone to Light.
        let mut img = solid(20, 100, [0, 0, 0]);
        for y in 0..15 {
            for x in 0..20 {
                img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        for y in 85..100 {
            for x in 0..20 {
                img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        assert_eq!(tone_for_image(&img), TextTone::Dark);
    }

    #[test]
    fn test_tiny_image_does_not_panic() {
        assert_eq!(tone_for_image(&solid(1, 1, [0, 0, 0])), TextTone::Light);
    }
}
