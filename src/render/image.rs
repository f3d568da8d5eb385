use crate::foundation::core::{Extent, Rgba, Vec2};
use crate::foundation::error::{AfterimageError, AfterimageResult};
use crate::render::backend::PixelFormat;

/// CPU-side color image, row-major, top row first.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorImage {
    extent: Extent,
    format: PixelFormat,
    texels: Vec<Rgba>,
}

fn check_extent(extent: Extent) -> AfterimageResult<()> {
    if extent.is_empty() {
        return Err(AfterimageError::render(format!(
            "image extent {}x{} is empty",
            extent.width, extent.height
        )));
    }
    Ok(())
}

impl ColorImage {
    /// Allocate an image filled with `fill` (quantized to `format`).
    pub fn new(extent: Extent, format: PixelFormat, fill: Rgba) -> AfterimageResult<Self> {
        check_extent(extent)?;
        Ok(Self {
            extent,
            format,
            texels: vec![quantize(format, fill); extent.texel_count()],
        })
    }

    /// Build an image from existing texels, quantizing each to `format`.
    pub fn from_texels(
        extent: Extent,
        format: PixelFormat,
        texels: Vec<Rgba>,
    ) -> AfterimageResult<Self> {
        check_extent(extent)?;
        if texels.len() != extent.texel_count() {
            return Err(AfterimageError::render(format!(
                "expected {} texels for {}x{}, got {}",
                extent.texel_count(),
                extent.width,
                extent.height,
                texels.len()
            )));
        }
        Ok(Self {
            extent,
            format,
            texels: texels.into_iter().map(|t| quantize(format, t)).collect(),
        })
    }

    /// Dimensions.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Channel storage.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// All texels, row-major.
    pub fn texels(&self) -> &[Rgba] {
        &self.texels
    }

    pub(crate) fn texels_mut(&mut self) -> &mut [Rgba] {
        &mut self.texels
    }

    /// Texel fetch with clamp-to-edge addressing.
    pub fn texel(&self, x: i64, y: i64) -> Rgba {
        let cx = x.clamp(0, i64::from(self.extent.width) - 1) as usize;
        let cy = y.clamp(0, i64::from(self.extent.height) - 1) as usize;
        self.texels[cy * self.extent.width as usize + cx]
    }

    /// Overwrite one texel (quantized to the image format). Out-of-range writes are ignored.
    pub fn store(&mut self, x: u32, y: u32, value: Rgba) {
        if x >= self.extent.width || y >= self.extent.height {
            return;
        }
        let idx = y as usize * self.extent.width as usize + x as usize;
        self.texels[idx] = quantize(self.format, value);
    }

    /// Fill every texel with `value`.
    pub fn fill(&mut self, value: Rgba) {
        let v = quantize(self.format, value);
        self.texels.fill(v);
    }

    /// Bilinear sample at `uv` with clamp-to-edge addressing; texel centers sit at half-integers.
    pub fn sample_bilinear(&self, uv: Vec2) -> Rgba {
        let x = uv.x * self.extent.width as f32 - 0.5;
        let y = uv.y * self.extent.height as f32 - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (ix, iy) = (x0 as i64, y0 as i64);

        let top = self.texel(ix, iy).lerp(self.texel(ix + 1, iy), fx);
        let bottom = self.texel(ix, iy + 1).lerp(self.texel(ix + 1, iy + 1), fx);
        top.lerp(bottom, fy)
    }

    /// Convert to tightly packed RGBA8 bytes (straight alpha).
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.texels.len() * 4);
        for t in &self.texels {
            for c in t.to_array() {
                out.push(unorm8(c));
            }
        }
        out
    }
}

fn unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Round a value to what a target of `format` can store.
pub(crate) fn quantize(format: PixelFormat, v: Rgba) -> Rgba {
    match format {
        PixelFormat::Rgba8Unorm => {
            Rgba::from_array(v.to_array().map(|c| f32::from(unorm8(c)) / 255.0))
        }
        PixelFormat::Rgba16Float => {
            Rgba::from_array(v.to_array().map(|c| half::f16::from_f32(c).to_f32()))
        }
        PixelFormat::Rgba32Float => v,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/image.rs"]
mod tests;
