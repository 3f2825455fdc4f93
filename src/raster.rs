//! Single-band GeoTIFF access: georeferencing tags, CRS, and nearest-cell
//! value reads.

use std::{collections::HashMap, fs::File, io::BufReader, path::Path};

use anyhow::{anyhow, Context, Result};
use tiff::{
    decoder::{Decoder, DecodingResult},
    tags::Tag,
    ColorType,
};

// GeoTIFF key directory entries consumed for the CRS check.
const GEO_KEY_GEOGRAPHIC_TYPE: u32 = 2048;
const GEO_KEY_PROJECTED_CS_TYPE: u32 = 3072;
const GEO_KEY_USER_DEFINED: u32 = 32767;

enum ChunkLayout {
    Stripped { chunk_height: u32 },
    Tiled { tile_width: u32, tile_height: u32, tiles_per_row: u32 },
}

/// An open single-band GeoTIFF. Chunks (strips or tiles) are decoded on
/// demand and cached, so nearby points pay the I/O cost once. The file
/// handle lives as long as the value and is released on drop.
pub struct GeoTiff {
    decoder: Decoder<BufReader<File>>,
    width: u32,
    height: u32,
    origin_x: f64,
    origin_y: f64,
    scale_x: f64,
    scale_y: f64,
    epsg: Option<u32>,
    layout: ChunkLayout,
    // chunk index -> (row stride, decoded values)
    cache: HashMap<u32, (usize, Vec<f64>)>,
}

impl GeoTiff {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Cannot open raster file `{}`", path.display()))?;
        let mut decoder = Decoder::new(BufReader::new(file))
            .with_context(|| format!("`{}` is not a readable TIFF", path.display()))?;

        match decoder.colortype()? {
            ColorType::Gray(_) => {}
            _ => {
                return Err(anyhow!(
                    "`{}` is not a single-band raster",
                    path.display()
                ))
            }
        }

        let (width, height) = decoder
            .dimensions()
            .with_context(|| format!("Cannot read dimensions of `{}`", path.display()))?;
        let (chunk_width, chunk_height) = decoder.chunk_dimensions();
        let layout = if chunk_width == width {
            ChunkLayout::Stripped { chunk_height }
        } else {
            ChunkLayout::Tiled {
                tile_width: chunk_width,
                tile_height: chunk_height,
                tiles_per_row: width.div_ceil(chunk_width),
            }
        };

        let scale = tag_f64_vec(&mut decoder, Tag::ModelPixelScaleTag)?
            .ok_or_else(|| anyhow!("`{}` has no pixel scale tag; not georeferenced", path.display()))?;
        let tiepoint = tag_f64_vec(&mut decoder, Tag::ModelTiepointTag)?
            .ok_or_else(|| anyhow!("`{}` has no tiepoint tag; not georeferenced", path.display()))?;
        if scale.len() < 2 || scale[0] <= 0.0 || scale[1] <= 0.0 {
            return Err(anyhow!("`{}` has a degenerate pixel scale", path.display()));
        }
        if tiepoint.len() < 6 {
            return Err(anyhow!("`{}` has a malformed tiepoint tag", path.display()));
        }
        // Tiepoint maps raster (i, j) to model (x, y); normalise to the model
        // coordinate of the top-left corner.
        let (scale_x, scale_y) = (scale[0], scale[1]);
        let origin_x = tiepoint[3] - tiepoint[0] * scale_x;
        let origin_y = tiepoint[4] + tiepoint[1] * scale_y;

        let epsg = match decoder.find_tag(Tag::GeoKeyDirectoryTag)? {
            Some(value) => epsg_from_geokeys(&value.into_u32_vec()?),
            None => None,
        };

        Ok(GeoTiff {
            decoder,
            width,
            height,
            origin_x,
            origin_y,
            scale_x,
            scale_y,
            epsg,
            layout,
            cache: HashMap::new(),
        })
    }

    /// EPSG code from the GeoTIFF key directory, if one is declared.
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Reads the value of the cell containing the model coordinate (x, y).
    /// No interpolation. Returns `None` when the point lies outside the
    /// raster extent.
    pub fn sample(&mut self, x: f64, y: f64) -> Result<Option<f64>> {
        let col_f = (x - self.origin_x) / self.scale_x;
        let row_f = (self.origin_y - y) / self.scale_y;
        if col_f < 0.0 || row_f < 0.0 {
            return Ok(None);
        }
        let (col, row) = (col_f.floor() as u32, row_f.floor() as u32);
        if col >= self.width || row >= self.height {
            return Ok(None);
        }

        let (chunk_index, local_row, local_col) = match &self.layout {
            ChunkLayout::Stripped { chunk_height } => {
                (row / chunk_height, row % chunk_height, col)
            }
            ChunkLayout::Tiled { tile_width, tile_height, tiles_per_row } => {
                let chunk_index = (row / tile_height) * tiles_per_row + col / tile_width;
                (chunk_index, row % tile_height, col % tile_width)
            }
        };

        if !self.cache.contains_key(&chunk_index) {
            let (data_width, _) = self.decoder.chunk_data_dimensions(chunk_index);
            let decoded = self
                .decoder
                .read_chunk(chunk_index)
                .with_context(|| format!("Failed to read raster chunk {}", chunk_index))?;
            self.cache
                .insert(chunk_index, (data_width as usize, decode_to_f64(decoded)?));
        }

        let (stride, values) = &self.cache[&chunk_index];
        let index = local_row as usize * stride + local_col as usize;
        Ok(values.get(index).copied())
    }
}

fn tag_f64_vec(decoder: &mut Decoder<BufReader<File>>, tag: Tag) -> Result<Option<Vec<f64>>> {
    match decoder.find_tag(tag)? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}

fn decode_to_f64(decoded: DecodingResult) -> Result<Vec<f64>> {
    let values = match decoded {
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::F64(v) => v,
    };
    Ok(values)
}

/// Walks the GeoKeyDirectory entries and returns the declared EPSG code,
/// preferring a projected CRS over a geographic one. Entries are quadruples
/// of (key id, tag location, count, value); inline values have location 0.
fn epsg_from_geokeys(directory: &[u32]) -> Option<u32> {
    if directory.len() < 4 {
        return None;
    }
    let entries = directory[3] as usize;
    let mut geographic = None;
    let mut projected = None;
    for entry in 0..entries {
        let base = 4 + entry * 4;
        if base + 3 >= directory.len() {
            break;
        }
        let (key, location, value) = (directory[base], directory[base + 1], directory[base + 3]);
        if location != 0 {
            continue;
        }
        match key {
            GEO_KEY_GEOGRAPHIC_TYPE => geographic = Some(value),
            GEO_KEY_PROJECTED_CS_TYPE => projected = Some(value),
            _ => {}
        }
    }
    projected
        .or(geographic)
        .filter(|&code| code != 0 && code != GEO_KEY_USER_DEFINED)
}

// -- Test fixtures -----------------------------------------------------------

/// Writes a small georeferenced single-band float GeoTIFF: `width` x `height`
/// cells of size 1.0 with the top-left corner at (`origin_x`, `origin_y`).
#[cfg(test)]
pub(crate) fn write_geotiff_fixture(
    path: &Path,
    width: u32,
    height: u32,
    origin_x: f64,
    origin_y: f64,
    values: &[f64],
    epsg: u16,
) {
    use tiff::encoder::{colortype, TiffEncoder};

    let mut file = File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(&mut file).unwrap();
    let mut image = encoder
        .new_image::<colortype::Gray64Float>(width, height)
        .unwrap();
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &[1.0f64, 1.0, 0.0][..])
        .unwrap();
    image
        .encoder()
        .write_tag(
            Tag::ModelTiepointTag,
            &[0.0f64, 0.0, 0.0, origin_x, origin_y, 0.0][..],
        )
        .unwrap();
    // Minimal key directory: geographic model, explicit EPSG code.
    image
        .encoder()
        .write_tag(
            Tag::GeoKeyDirectoryTag,
            &[1u16, 1, 0, 2, 1024, 0, 1, 2, 2048, 0, 1, epsg][..],
        )
        .unwrap();
    image.write_data(values).unwrap();
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use tempfile::TempDir;

    use super::*;

    fn grid_fixture(dir: &Path) -> std::path::PathBuf {
        // 4x4 grid, top-left corner at (10, 50), value = row * 4 + col.
        let values: Vec<f64> = (0..16).map(f64::from).collect();
        let path = dir.join("grid.tif");
        write_geotiff_fixture(&path, 4, 4, 10.0, 50.0, &values, 4326);
        path
    }

    #[test]
    fn should_read_georeferencing_and_crs() {
        let tmp = TempDir::new().unwrap();
        let raster = GeoTiff::open(&grid_fixture(tmp.path())).unwrap();

        assert_eq!(raster.epsg(), Some(4326));
        assert_eq!(raster.width, 4);
        assert_eq!(raster.height, 4);
    }

    #[test]
    fn should_sample_nearest_cell() {
        let tmp = TempDir::new().unwrap();
        let mut raster = GeoTiff::open(&grid_fixture(tmp.path())).unwrap();

        // cell centres
        assert_eq!(raster.sample(10.5, 49.5).unwrap(), Some(0.0));
        assert_eq!(raster.sample(13.5, 49.5).unwrap(), Some(3.0));
        assert_eq!(raster.sample(10.5, 46.5).unwrap(), Some(12.0));
        assert_eq!(raster.sample(13.5, 46.5).unwrap(), Some(15.0));
        // off-centre still snaps to the containing cell
        assert_eq!(raster.sample(11.9, 48.1).unwrap(), Some(5.0));
    }

    #[test]
    fn should_return_none_outside_extent() {
        let tmp = TempDir::new().unwrap();
        let mut raster = GeoTiff::open(&grid_fixture(tmp.path())).unwrap();

        assert_eq!(raster.sample(9.0, 49.5).unwrap(), None);
        assert_eq!(raster.sample(10.5, 51.0).unwrap(), None);
        assert_eq!(raster.sample(14.5, 49.5).unwrap(), None);
        assert_eq!(raster.sample(10.5, 45.9).unwrap(), None);
    }

    #[test]
    fn should_prefer_projected_crs_code() {
        let directory = [1, 1, 0, 3, 1024, 0, 1, 1, 2048, 0, 1, 4258, 3072, 0, 1, 25832];
        assert_eq!(epsg_from_geokeys(&directory), Some(25832));
    }

    #[test]
    fn should_ignore_user_defined_crs_code() {
        let directory = [1, 1, 0, 1, 3072, 0, 1, 32767];
        assert_eq!(epsg_from_geokeys(&directory), None);
    }
}
