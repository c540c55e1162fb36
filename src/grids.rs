use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    error::GribError,
    utils::{read_as, GribInt},
};

/// Grid definition template numbers implemented by this crate
/// (Code Table 3.1).
#[derive(Debug, Eq, PartialEq, Clone, Copy, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum GridTemplateNumber {
    LatLon = 0,
    Mercator = 10,
    PolarStereographic = 20,
    LambertConformal = 30,
    Gaussian = 40,
    SpaceView = 90,
}

/// A value stored as a scale factor and a scaled integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScaledValue {
    pub factor: u8,
    pub value: u32,
}

/// Basic angle of the initial production domain and its subdivisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BasicAngle {
    pub angle: u32,
    pub subdivisions: u32,
}

/// Earth shape parameters shared by every grid definition template
/// (octets 15-30 of Section 3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridHeader {
    /// Shape of the earth (Code Table 3.2).
    pub earth_shape: u8,
    /// Radius of a spherical earth.
    pub spherical_radius: ScaledValue,
    /// Major axis of an oblate spheroid earth.
    pub major_axis: ScaledValue,
    /// Minor axis of an oblate spheroid earth.
    pub minor_axis: ScaledValue,
}

const GRID_HEADER_SIZE: usize = 16;

impl GridHeader {
    fn from_buf(buf: &[u8]) -> Self {
        Self {
            earth_shape: buf[0],
            spherical_radius: ScaledValue {
                factor: buf[1],
                value: read_as!(u32, buf, 2),
            },
            major_axis: ScaledValue {
                factor: buf[6],
                value: read_as!(u32, buf, 7),
            },
            minor_axis: ScaledValue {
                factor: buf[11],
                value: read_as!(u32, buf, 12),
            },
        }
    }
}

/// Grid Definition Template 3.0: latitude/longitude (equidistant
/// cylindrical, or Plate Carree).
///
/// Latitudes, longitudes and increments are fixed-point values scaled
/// by 10^-6 degrees; latitudes and longitudes are sign-magnitude
/// encoded on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LatLonGrid {
    pub header: GridHeader,
    /// Number of points along a parallel.
    pub ni: u32,
    /// Number of points along a meridian.
    pub nj: u32,
    pub basic_angle: BasicAngle,
    /// Latitude of the first grid point.
    pub la1: i32,
    /// Longitude of the first grid point.
    pub lo1: i32,
    /// Resolution and component flags (Flag Table 3.3).
    pub resolution_flags: u8,
    /// Latitude of the last grid point.
    pub la2: i32,
    /// Longitude of the last grid point.
    pub lo2: i32,
    /// i-direction increment.
    pub di: i32,
    /// j-direction increment.
    pub dj: i32,
    /// Scanning mode (Flag Table 3.4).
    pub scanning_mode: u8,
}

/// Grid Definition Template 3.10: Mercator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MercatorGrid {
    pub header: GridHeader,
    pub ni: u32,
    pub nj: u32,
    pub la1: i32,
    pub lo1: i32,
    pub resolution_flags: u8,
    /// Latitude at which the Mercator projection intersects the earth.
    pub lad: i32,
    pub la2: i32,
    pub lo2: i32,
    pub scanning_mode: u8,
    pub orientation: u32,
    pub di: i32,
    pub dj: i32,
}

/// Grid Definition Template 3.20: polar stereographic projection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolarStereoGrid {
    pub header: GridHeader,
    pub nx: u32,
    pub ny: u32,
    pub la1: i32,
    pub lo1: i32,
    pub resolution_flags: u8,
    /// Latitude where dx and dy are specified.
    pub lad: i32,
    /// Orientation longitude of the grid.
    pub lov: i32,
    pub dx: i32,
    pub dy: i32,
    pub projection_centre: u8,
    pub scanning_mode: u8,
}

/// Grid Definition Template 3.30: Lambert conformal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LambertGrid {
    pub header: GridHeader,
    pub nx: u32,
    pub ny: u32,
    pub la1: i32,
    pub lo1: i32,
    pub resolution_flags: u8,
    pub lad: i32,
    pub lov: i32,
    pub dx: i32,
    pub dy: i32,
    pub projection_centre: u8,
    pub scanning_mode: u8,
    /// First latitude from the pole at which the secant cone cuts the
    /// sphere.
    pub latin1: u32,
    /// Second latitude from the pole.
    pub latin2: u32,
    pub la_south_pole: u32,
    pub lo_south_pole: u32,
}

/// Grid Definition Template 3.40: Gaussian latitude/longitude.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GaussianGrid {
    pub header: GridHeader,
    pub ni: u32,
    pub nj: u32,
    pub basic_angle: BasicAngle,
    pub la1: i32,
    pub lo1: i32,
    pub resolution_flags: u8,
    pub la2: i32,
    pub lo2: i32,
    pub di: i32,
    /// Number of parallels between a pole and the equator.
    pub n: u32,
    pub scanning_mode: u8,
}

/// Grid Definition Template 3.90: space view perspective or
/// orthographic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpaceViewGrid {
    pub header: GridHeader,
    pub nx: u32,
    pub ny: u32,
    /// Latitude of the sub-satellite point.
    pub lap: i32,
    /// Longitude of the sub-satellite point.
    pub lop: i32,
    pub resolution_flags: u8,
    pub dx: u32,
    pub dy: u32,
    pub xp: u32,
    pub yp: u32,
    pub scanning_mode: u8,
    pub orientation: u32,
    /// Altitude of the camera, as a multiple of the earth radius.
    pub nr: u32,
    pub xo: u32,
    pub yo: u32,
}

/// Grid geometry decoded from Section 3, one variant per supported
/// template number. An unsupported number is kept as [`Grid::Unknown`]
/// carrying the raw code; the section parser rejects it with
/// [`GribError::UnsupportedTemplate`] rather than guessing a layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Grid {
    LatLon(LatLonGrid),
    Mercator(MercatorGrid),
    PolarStereo(PolarStereoGrid),
    Lambert(LambertGrid),
    Gaussian(GaussianGrid),
    SpaceView(SpaceViewGrid),
    Unknown(u16),
}

impl Grid {
    pub(crate) fn from_template(number: u16, buf: &[u8]) -> Result<Self, GribError> {
        let Ok(template) = GridTemplateNumber::try_from(number) else {
            return Ok(Self::Unknown(number));
        };

        let required = match template {
            GridTemplateNumber::LatLon => 58,
            GridTemplateNumber::Mercator => 58,
            GridTemplateNumber::PolarStereographic => 51,
            GridTemplateNumber::LambertConformal => 67,
            GridTemplateNumber::Gaussian => 58,
            GridTemplateNumber::SpaceView => 66,
        };
        if buf.len() < required {
            return Err(GribError::InputTruncated(buf.len()));
        }

        let header = GridHeader::from_buf(&buf[..GRID_HEADER_SIZE]);

        let grid = match template {
            GridTemplateNumber::LatLon => Self::LatLon(LatLonGrid {
                header,
                ni: read_as!(u32, buf, 16),
                nj: read_as!(u32, buf, 20),
                basic_angle: BasicAngle {
                    angle: read_as!(u32, buf, 24),
                    subdivisions: read_as!(u32, buf, 28),
                },
                la1: read_as!(u32, buf, 32).as_grib_int(),
                lo1: read_as!(u32, buf, 36).as_grib_int(),
                resolution_flags: buf[40],
                la2: read_as!(u32, buf, 41).as_grib_int(),
                lo2: read_as!(u32, buf, 45).as_grib_int(),
                di: read_as!(u32, buf, 49) as i32,
                dj: read_as!(u32, buf, 53) as i32,
                scanning_mode: buf[57],
            }),
            GridTemplateNumber::Mercator => Self::Mercator(MercatorGrid {
                header,
                ni: read_as!(u32, buf, 16),
                nj: read_as!(u32, buf, 20),
                la1: read_as!(u32, buf, 24).as_grib_int(),
                lo1: read_as!(u32, buf, 28).as_grib_int(),
                resolution_flags: buf[32],
                lad: read_as!(u32, buf, 33) as i32,
                la2: read_as!(u32, buf, 37).as_grib_int(),
                lo2: read_as!(u32, buf, 41).as_grib_int(),
                scanning_mode: buf[45],
                orientation: read_as!(u32, buf, 46),
                di: read_as!(u32, buf, 50) as i32,
                dj: read_as!(u32, buf, 54) as i32,
            }),
            GridTemplateNumber::PolarStereographic => Self::PolarStereo(PolarStereoGrid {
                header,
                nx: read_as!(u32, buf, 16),
                ny: read_as!(u32, buf, 20),
                la1: read_as!(u32, buf, 24).as_grib_int(),
                lo1: read_as!(u32, buf, 28).as_grib_int(),
                resolution_flags: buf[32],
                lad: read_as!(u32, buf, 33) as i32,
                lov: read_as!(u32, buf, 37) as i32,
                dx: read_as!(u32, buf, 41) as i32,
                dy: read_as!(u32, buf, 45) as i32,
                projection_centre: buf[49],
                scanning_mode: buf[50],
            }),
            GridTemplateNumber::LambertConformal => Self::Lambert(LambertGrid {
                header,
                nx: read_as!(u32, buf, 16),
                ny: read_as!(u32, buf, 20),
                la1: read_as!(u32, buf, 24).as_grib_int(),
                lo1: read_as!(u32, buf, 28).as_grib_int(),
                resolution_flags: buf[32],
                lad: read_as!(u32, buf, 33) as i32,
                lov: read_as!(u32, buf, 37) as i32,
                dx: read_as!(u32, buf, 41) as i32,
                dy: read_as!(u32, buf, 45) as i32,
                projection_centre: buf[49],
                scanning_mode: buf[50],
                latin1: read_as!(u32, buf, 51),
                latin2: read_as!(u32, buf, 55),
                la_south_pole: read_as!(u32, buf, 59),
                lo_south_pole: read_as!(u32, buf, 63),
            }),
            GridTemplateNumber::Gaussian => Self::Gaussian(GaussianGrid {
                header,
                ni: read_as!(u32, buf, 16),
                nj: read_as!(u32, buf, 20),
                basic_angle: BasicAngle {
                    angle: read_as!(u32, buf, 24),
                    subdivisions: read_as!(u32, buf, 28),
                },
                la1: read_as!(u32, buf, 32).as_grib_int(),
                lo1: read_as!(u32, buf, 36).as_grib_int(),
                resolution_flags: buf[40],
                la2: read_as!(u32, buf, 41).as_grib_int(),
                lo2: read_as!(u32, buf, 45).as_grib_int(),
                di: read_as!(u32, buf, 49) as i32,
                n: read_as!(u32, buf, 53),
                scanning_mode: buf[57],
            }),
            GridTemplateNumber::SpaceView => Self::SpaceView(SpaceViewGrid {
                header,
                nx: read_as!(u32, buf, 16),
                ny: read_as!(u32, buf, 20),
                lap: read_as!(u32, buf, 24).as_grib_int(),
                lop: read_as!(u32, buf, 28).as_grib_int(),
                resolution_flags: buf[32],
                dx: read_as!(u32, buf, 33),
                dy: read_as!(u32, buf, 37),
                xp: read_as!(u32, buf, 41),
                yp: read_as!(u32, buf, 45),
                scanning_mode: buf[49],
                orientation: read_as!(u32, buf, 50),
                nr: read_as!(u32, buf, 54),
                xo: read_as!(u32, buf, 58),
                yo: read_as!(u32, buf, 62),
            }),
        };
        Ok(grid)
    }

    /// The template number this geometry was decoded from.
    pub fn template_number(&self) -> u16 {
        match self {
            Self::LatLon(_) => GridTemplateNumber::LatLon.into(),
            Self::Mercator(_) => GridTemplateNumber::Mercator.into(),
            Self::PolarStereo(_) => GridTemplateNumber::PolarStereographic.into(),
            Self::Lambert(_) => GridTemplateNumber::LambertConformal.into(),
            Self::Gaussian(_) => GridTemplateNumber::Gaussian.into(),
            Self::SpaceView(_) => GridTemplateNumber::SpaceView.into(),
            Self::Unknown(number) => *number,
        }
    }

    /// The earth shape header shared by all supported geometries.
    pub fn header(&self) -> Option<&GridHeader> {
        match self {
            Self::LatLon(g) => Some(&g.header),
            Self::Mercator(g) => Some(&g.header),
            Self::PolarStereo(g) => Some(&g.header),
            Self::Lambert(g) => Some(&g.header),
            Self::Gaussian(g) => Some(&g.header),
            Self::SpaceView(g) => Some(&g.header),
            Self::Unknown(_) => None,
        }
    }

    pub fn scanning_mode(&self) -> Option<u8> {
        match self {
            Self::LatLon(g) => Some(g.scanning_mode),
            Self::Mercator(g) => Some(g.scanning_mode),
            Self::PolarStereo(g) => Some(g.scanning_mode),
            Self::Lambert(g) => Some(g.scanning_mode),
            Self::Gaussian(g) => Some(g.scanning_mode),
            Self::SpaceView(g) => Some(g.scanning_mode),
            Self::Unknown(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lat_lon_template() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(6); // earth shape
        buf.push(0);
        buf.extend_from_slice(&6_371_229u32.to_be_bytes());
        buf.extend_from_slice(&[0; 10]); // major/minor axes unused
        buf.extend_from_slice(&144u32.to_be_bytes()); // ni
        buf.extend_from_slice(&73u32.to_be_bytes()); // nj
        buf.extend_from_slice(&[0; 8]); // basic angle
        buf.extend_from_slice(&90_000_000u32.to_be_bytes()); // la1
        buf.extend_from_slice(&0u32.to_be_bytes()); // lo1
        buf.push(0b0011_0000); // resolution flags
        buf.extend_from_slice(&(90_000_000u32 | 0x8000_0000).to_be_bytes()); // la2 = -90
        buf.extend_from_slice(&357_500_000u32.to_be_bytes()); // lo2
        buf.extend_from_slice(&2_500_000u32.to_be_bytes()); // di
        buf.extend_from_slice(&2_500_000u32.to_be_bytes()); // dj
        buf.push(0); // scanning mode
        buf
    }

    #[test]
    fn lat_lon_grid_from_template() {
        let buf = lat_lon_template();
        let grid = Grid::from_template(0, &buf).unwrap();
        let Grid::LatLon(grid) = grid else {
            panic!("expected a lat/lon grid");
        };
        assert_eq!(grid.header.earth_shape, 6);
        assert_eq!(grid.header.spherical_radius.value, 6_371_229);
        assert_eq!((grid.ni, grid.nj), (144, 73));
        assert_eq!((grid.la1, grid.lo1), (90_000_000, 0));
        assert_eq!((grid.la2, grid.lo2), (-90_000_000, 357_500_000));
        assert_eq!((grid.di, grid.dj), (2_500_000, 2_500_000));
    }

    #[test]
    fn unknown_template_number_is_kept_as_raw_code() {
        let grid = Grid::from_template(204, &[]).unwrap();
        assert_eq!(grid, Grid::Unknown(204));
        assert_eq!(grid.template_number(), 204);
        assert_eq!(grid.header(), None);
    }

    #[test]
    fn short_template_is_truncation() {
        let buf = lat_lon_template();
        assert_eq!(
            Grid::from_template(0, &buf[..40]),
            Err(GribError::InputTruncated(40))
        );
    }
}
