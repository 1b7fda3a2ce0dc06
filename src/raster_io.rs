use crate::georef::GeoTransform;
use crate::types::*;
use flate2::read::GzDecoder;
use ndarray::Array2;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

#[cfg(feature = "gdal")]
use gdal::{raster::ResampleAlg, Dataset};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;

/// Supplies a single-band raster and its geotransform for one capture file.
pub trait RasterSource {
    fn read(&self, path: &Path) -> Result<RasterGrid, ZonalError>;
}

pub fn is_gzip(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "gz")
}

/// `.tif` or `.tif.gz`
pub fn is_raster_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.ends_with(".tif") || n.ends_with(".tif.gz"))
}

/// Pure-Rust GeoTIFF reader; gzip-compressed files are inflated in memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiffRasterSource;

impl RasterSource for TiffRasterSource {
    fn read(&self, path: &Path) -> Result<RasterGrid, ZonalError> {
        let mut bytes = Vec::new();
        let file = File::open(path)?;
        if is_gzip(path) {
            GzDecoder::new(file).read_to_end(&mut bytes)?;
        } else {
            let mut file = file;
            file.read_to_end(&mut bytes)?;
        }
        Self::decode(bytes)
    }
}

impl TiffRasterSource {
    pub fn decode(bytes: Vec<u8>) -> Result<RasterGrid, ZonalError> {
        let mut decoder = Decoder::new(Cursor::new(bytes))?;
        let (width, height) = decoder.dimensions()?;
        let (width, height) = (width as usize, height as usize);

        let transformation = Self::f64_tag(&mut decoder, MODEL_TRANSFORMATION)?;
        let tiepoint = Self::f64_tag(&mut decoder, MODEL_TIEPOINT)?;
        let scale = Self::f64_tag(&mut decoder, MODEL_PIXEL_SCALE)?;
        let transform = geo_transform_from_tags(
            transformation.as_deref(),
            tiepoint.as_deref(),
            scale.as_deref(),
        )?;

        let samples = widen(decoder.read_image()?)?;
        if samples.len() != width * height {
            return Err(ZonalError::Raster(format!(
                "expected {} samples for a {}x{} single-band image, found {}",
                width * height,
                width,
                height,
                samples.len()
            )));
        }

        let data = Array2::from_shape_vec((height, width), samples)
            .map_err(|e| ZonalError::Raster(format!("Failed to create array: {}", e)))?;

        Ok(RasterGrid::new(data, transform))
    }

    fn f64_tag(
        decoder: &mut Decoder<Cursor<Vec<u8>>>,
        code: u16,
    ) -> Result<Option<Vec<f64>>, ZonalError> {
        match decoder.find_tag(Tag::from_u16_exhaustive(code))? {
            Some(value) => Ok(Some(value.into_f64_vec()?)),
            None => Ok(None),
        }
    }
}

/// Derives the GDAL-order geotransform from GeoTIFF model tags. A full
/// transformation matrix wins over tiepoint + scale.
pub fn geo_transform_from_tags(
    transformation: Option<&[f64]>,
    tiepoint: Option<&[f64]>,
    scale: Option<&[f64]>,
) -> Result<GeoTransform, ZonalError> {
    if let Some(m) = transformation {
        if m.len() >= 8 {
            return Ok(GeoTransform::new(m[3], m[0], m[1], m[7], m[4], m[5]));
        }
    }

    match (tiepoint, scale) {
        (Some(tp), Some(sc)) if tp.len() >= 6 && sc.len() >= 2 => {
            let (i, j, x, y) = (tp[0], tp[1], tp[3], tp[4]);
            let (sx, sy) = (sc[0], sc[1]);
            Ok(GeoTransform::new(
                x - i * sx,
                sx,
                0.0,
                y + j * sy,
                0.0,
                -sy,
            ))
        }
        _ => Err(ZonalError::Raster(
            "no usable GeoTIFF georeferencing tags".to_string(),
        )),
    }
}

#[allow(unreachable_patterns)]
fn widen(result: DecodingResult) -> Result<Vec<f64>, ZonalError> {
    Ok(match result {
        DecodingResult::F64(v) => v,
        DecodingResult::F32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(f64::from).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        _ => {
            return Err(ZonalError::Raster(
                "unsupported TIFF sample type".to_string(),
            ))
        }
    })
}

/// Reads band 1 through GDAL, using `/vsigzip/` for compressed files.
#[cfg(feature = "gdal")]
#[derive(Debug, Clone, Copy, Default)]
pub struct GdalRasterSource;

#[cfg(feature = "gdal")]
impl RasterSource for GdalRasterSource {
    fn read(&self, path: &Path) -> Result<RasterGrid, ZonalError> {
        let dataset = if is_gzip(path) {
            Dataset::open(format!("/vsigzip/{}", path.display()))?
        } else {
            Dataset::open(path)?
        };
        let transform = dataset.geo_transform()?;

        let band = dataset.rasterband(1)?;
        let (width, height) = band.size();

        let mut data = vec![0f64; width * height];
        band.read_into_slice(
            (0, 0),
            (width, height),
            (width, height),
            &mut data,
            Some(ResampleAlg::NearestNeighbour),
        )?;

        let array = Array2::from_shape_vec((height, width), data)
            .map_err(|e| ZonalError::Raster(format!("Failed to create array: {}", e)))?;

        Ok(RasterGrid::new(array, GeoTransform::from(transform)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tiff::encoder::{colortype, TiffEncoder};

    #[test]
    fn test_raster_file_detection() {
        assert!(is_raster_file(Path::new("/d/ECOSTRESS_L2_x.tif")));
        assert!(is_raster_file(Path::new("ECOSTRESS_L2_x.tif.gz")));
        assert!(!is_raster_file(Path::new("ECOSTRESS_L2_x.tif.json")));
        assert!(!is_raster_file(Path::new("notes.txt")));
        assert!(is_gzip(Path::new("a.tif.gz")));
        assert!(!is_gzip(Path::new("a.tif")));
    }

    #[test]
    fn test_transform_from_tiepoint_and_scale() {
        let t = geo_transform_from_tags(
            None,
            Some(&[0.0, 0.0, 0.0, -13.5, 10.0, 0.0]),
            Some(&[0.0007, 0.0007, 0.0]),
        )
        .unwrap();
        assert_eq!(t, GeoTransform::new(-13.5, 0.0007, 0.0, 10.0, 0.0, -0.0007));
    }

    #[test]
    fn test_transform_from_offset_tiepoint() {
        let t = geo_transform_from_tags(
            None,
            Some(&[2.0, 4.0, 0.0, 102.0, 46.0, 0.0]),
            Some(&[1.0, 0.5, 0.0]),
        )
        .unwrap();
        assert_eq!(t.pixel_to_world(2, 4), (102.0, 46.0));
    }

    #[test]
    fn test_transformation_matrix_takes_precedence() {
        let m = [
            0.5, 0.1, 0.0, -12.0, //
            0.2, -0.5, 0.0, 9.0, //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        let t = geo_transform_from_tags(Some(&m), Some(&[0.0; 6]), Some(&[1.0, 1.0, 0.0])).unwrap();
        assert_eq!(t, GeoTransform::new(-12.0, 0.5, 0.1, 9.0, 0.2, -0.5));
    }

    #[test]
    fn test_missing_georeferencing() {
        assert!(matches!(
            geo_transform_from_tags(None, None, Some(&[1.0, 1.0])),
            Err(ZonalError::Raster(_))
        ));
    }

    fn geotiff_bytes() -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut buf).unwrap();
            let mut image = encoder.new_image::<colortype::Gray32Float>(2, 2).unwrap();
            image
                .encoder()
                .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), &[0.5f64, 0.5, 0.0][..])
                .unwrap();
            image
                .encoder()
                .write_tag(
                    Tag::Unknown(MODEL_TIEPOINT),
                    &[0.0f64, 0.0, 0.0, -11.5, 8.5, 0.0][..],
                )
                .unwrap();
            image.write_data(&[300.0f32, 290.5, -500.0, 310.25]).unwrap();
        }
        buf.into_inner()
    }

    fn assert_sample_grid(grid: &RasterGrid) {
        assert_eq!(grid.shape(), (2, 2));
        assert_eq!(grid.data[[0, 0]], 300.0);
        assert_eq!(grid.data[[0, 1]], 290.5);
        assert_eq!(grid.data[[1, 0]], -500.0);
        assert_eq!(grid.data[[1, 1]], 310.25);
        assert_eq!(
            grid.transform,
            GeoTransform::new(-11.5, 0.5, 0.0, 8.5, 0.0, -0.5)
        );
    }

    #[test]
    fn test_reads_plain_geotiff() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.tif");
        std::fs::write(&path, geotiff_bytes()).unwrap();

        let grid = TiffRasterSource.read(&path).unwrap();
        assert_sample_grid(&grid);
    }

    #[test]
    fn test_reads_gzipped_geotiff() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.tif.gz");
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(&geotiff_bytes()).unwrap();
        std::fs::write(&path, gz.finish().unwrap()).unwrap();

        let grid = TiffRasterSource.read(&path).unwrap();
        assert_sample_grid(&grid);
    }

    #[test]
    fn test_garbage_bytes_are_tiff_errors() {
        let err = TiffRasterSource::decode(b"not a tiff".to_vec()).unwrap_err();
        assert!(matches!(err, ZonalError::Tiff(_)));
    }
}
