use crate::{
    error::GribError,
    grids::{Grid, LatLonGrid},
    product::Surface,
    sections::Message,
};

/// A latitude/longitude bounding box in the grid's fixed-point
/// representation (degrees scaled by 10^6).
///
/// Latitudes follow the grid's north-to-south orientation: `min_lat`
/// is the northern edge and `max_lat` the southern one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GeoFilter {
    pub min_lat: i32,
    pub max_lat: i32,
    pub min_lon: i32,
    pub max_lon: i32,
}

/// Immutable selection options threaded through message filtering.
/// Every field defaults to "keep everything".
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Keep only messages of this discipline (Section 0).
    pub discipline: Option<u8>,
    /// Keep only products of this parameter category (Section 4).
    pub category: Option<u8>,
    /// Keep only products whose first fixed surface matches this type
    /// and value.
    pub surface: Option<Surface>,
    /// Cut every kept message's grid down to this bounding box.
    pub geo: Option<GeoFilter>,
    /// Stop after this many messages have been kept.
    pub max_messages: Option<usize>,
}

/// Maps a bounding box to half-open `(start_i, stop_i, start_j,
/// stop_j)` index bounds on a lat/lon grid, by integer floor division
/// of the box edges against the grid spacing, clamped to the grid's
/// actual dimensions.
pub fn start_stop_indexes(filter: &GeoFilter, grid: &LatLonGrid) -> (usize, usize, usize, usize) {
    let di = i64::from(grid.di);
    let dj = i64::from(grid.dj);
    let clamp_i = |v: i64| v.clamp(0, i64::from(grid.ni)) as usize;
    let clamp_j = |v: i64| v.clamp(0, i64::from(grid.nj)) as usize;

    let start_i = clamp_i((i64::from(filter.min_lon) - i64::from(grid.lo1)) / di);
    let stop_i = clamp_i((i64::from(filter.max_lon) - i64::from(grid.lo1)) / di);
    let start_j = clamp_j((i64::from(grid.la1) - i64::from(filter.min_lat)) / dj);
    let stop_j = clamp_j((i64::from(grid.la1) - i64::from(filter.max_lat)) / dj);

    (start_i, stop_i, start_j, stop_j)
}

fn lat_lon_grid(message: &Message) -> Result<&LatLonGrid, GribError> {
    match &message.section3.grid {
        Grid::LatLon(grid) => Ok(grid),
        other => Err(GribError::OperationError(format!(
            "geographic filtering needs a lat/lon grid, found template {}",
            other.template_number()
        ))),
    }
}

fn check_spacing(grid: &LatLonGrid) -> Result<(), GribError> {
    if grid.di <= 0 || grid.dj <= 0 {
        return Err(GribError::OperationError(format!(
            "grid spacing {}x{} is not usable for index computation",
            grid.di, grid.dj
        )));
    }
    Ok(())
}

/// Cuts a decoded message down to the bounding box: slices the value
/// array to the index rectangle and rewrites the grid's bounds and
/// point counts so geometry and data stay consistent.
pub fn apply_geo_filter(message: &mut Message, filter: &GeoFilter) -> Result<(), GribError> {
    let grid = lat_lon_grid(message)?;
    check_spacing(grid)?;
    let (start_i, stop_i, start_j, stop_j) = start_stop_indexes(filter, grid);
    let ni = grid.ni as usize;
    let new_ni = stop_i.saturating_sub(start_i);
    let new_nj = stop_j.saturating_sub(start_j);

    let data = &message.section7.data;
    let mut sliced = Vec::with_capacity(new_ni * new_nj);
    for j in start_j..stop_j {
        for i in start_i..stop_i {
            let value = data.get(j * ni + i).ok_or_else(|| {
                GribError::CorruptData(format!(
                    "grid declares {}x{} points but only {} values are present",
                    grid.ni,
                    grid.nj,
                    data.len()
                ))
            })?;
            sliced.push(*value);
        }
    }

    let num_points = (new_ni * new_nj) as u32;
    let Grid::LatLon(grid) = &mut message.section3.grid else {
        unreachable!();
    };
    grid.lo1 += start_i as i32 * grid.di;
    grid.la1 -= start_j as i32 * grid.dj;
    grid.lo2 = grid.lo1 + new_ni.saturating_sub(1) as i32 * grid.di;
    grid.la2 = grid.la1 - new_nj.saturating_sub(1) as i32 * grid.dj;
    grid.ni = new_ni as u32;
    grid.nj = new_nj as u32;
    message.section3.num_points = num_points;
    message.section5.num_points = num_points;
    message.section7.data = sliced;
    Ok(())
}

/// The mean of the values inside the bounding box, without modifying
/// the message.
pub fn average_value(message: &Message, filter: &GeoFilter) -> Result<f64, GribError> {
    let grid = lat_lon_grid(message)?;
    check_spacing(grid)?;
    let (start_i, stop_i, start_j, stop_j) = start_stop_indexes(filter, grid);
    let ni = grid.ni as usize;
    let count = stop_i.saturating_sub(start_i) * stop_j.saturating_sub(start_j);
    if count == 0 {
        return Err(GribError::OperationError(
            "bounding box selects no grid points".into(),
        ));
    }

    let data = &message.section7.data;
    let mut sum = 0.0;
    for j in start_j..stop_j {
        for i in start_i..stop_i {
            sum += data.get(j * ni + i).ok_or_else(|| {
                GribError::CorruptData(format!(
                    "grid declares {}x{} points but only {} values are present",
                    grid.ni,
                    grid.nj,
                    data.len()
                ))
            })?;
        }
    }
    Ok(sum / count as f64)
}

fn satisfies(message: &Message, options: &FilterOptions) -> bool {
    if let Some(discipline) = options.discipline {
        if message.section0.discipline != discipline {
            return false;
        }
    }
    if let Some(category) = options.category {
        if message.section4.product.parameter_category != category {
            return false;
        }
    }
    if let Some(surface) = options.surface {
        let first = message.section4.product.first_surface;
        if first.surface_type != surface.surface_type || first.value != surface.value {
            return false;
        }
    }
    true
}

/// Keeps the messages matching the discipline/category/surface
/// selection, applying the geographic filter to each kept message, up
/// to the configured message limit.
pub fn filter_messages(
    messages: Vec<Message>,
    options: &FilterOptions,
) -> Result<Vec<Message>, GribError> {
    let mut kept = Vec::new();
    for mut message in messages {
        if !satisfies(&message, options) {
            continue;
        }
        if let Some(geo) = &options.geo {
            apply_geo_filter(&mut message, geo)?;
        }
        kept.push(message);
        if options.max_messages.is_some_and(|limit| kept.len() >= limit) {
            break;
        }
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grids::{BasicAngle, GridHeader, ScaledValue};

    fn test_grid() -> LatLonGrid {
        LatLonGrid {
            header: GridHeader {
                earth_shape: 6,
                spherical_radius: ScaledValue { factor: 0, value: 0 },
                major_axis: ScaledValue { factor: 0, value: 0 },
                minor_axis: ScaledValue { factor: 0, value: 0 },
            },
            ni: 144,
            nj: 73,
            basic_angle: BasicAngle {
                angle: 0,
                subdivisions: 0,
            },
            la1: 90_000_000,
            lo1: 0,
            resolution_flags: 0,
            la2: -90_000_000,
            lo2: 357_500_000,
            di: 2_500_000,
            dj: 2_500_000,
            scanning_mode: 0,
        }
    }

    fn test_filter() -> GeoFilter {
        GeoFilter {
            min_lat: 71_000_000,
            max_lat: 57_000_000,
            min_lon: 4_400_000,
            max_lon: 32_000_000,
        }
    }

    #[test]
    fn start_stop_indexes_floor_divide_the_box() {
        let (start_i, stop_i, start_j, stop_j) = start_stop_indexes(&test_filter(), &test_grid());
        assert_eq!(start_i, 1);
        assert_eq!(stop_i, 12);
        assert_eq!(start_j, 7);
        assert_eq!(stop_j, 13);
    }

    #[test]
    fn indexes_are_clamped_to_the_grid() {
        let filter = GeoFilter {
            min_lat: 95_000_000,
            max_lat: -95_000_000,
            min_lon: -10_000_000,
            max_lon: 400_000_000,
        };
        let grid = test_grid();
        let (start_i, stop_i, start_j, stop_j) = start_stop_indexes(&filter, &grid);
        assert_eq!((start_i, stop_i), (0, 144));
        assert_eq!((start_j, stop_j), (0, 73));
    }

    fn test_message(grid: LatLonGrid) -> Message {
        use crate::{
            product::ProductDescriptor,
            repr::{DataRepresentation, Packing},
            sections::*,
        };
        let num_points = grid.ni * grid.nj;
        let data = (0..num_points).map(f64::from).collect::<Vec<_>>();
        Message {
            section0: Section0 {
                reserved: 0,
                discipline: 0,
                edition: 2,
                total_length: 0,
            },
            section1: Section1 {
                centre_id: 0,
                subcentre_id: 0,
                master_table_version: 2,
                local_table_version: 0,
                ref_time_significance: 1,
                time: Time::default(),
                production_status: 0,
                data_type: 1,
            },
            section2: None,
            section3: Section3 {
                source: 0,
                num_points,
                point_count_octets: 0,
                point_count_interpretation: 0,
                template_number: 0,
                grid: Grid::LatLon(grid),
            },
            section4: Section4 {
                coordinates_count: 0,
                template_number: 0,
                product: ProductDescriptor {
                    parameter_category: 0,
                    parameter_number: 0,
                    process_type: 2,
                    background_process: 0,
                    analysis_process: 96,
                    hours: 0,
                    minutes: 0,
                    time_unit: 1,
                    forecast_time: 6,
                    first_surface: Surface::default(),
                    second_surface: Surface::default(),
                },
                coordinates: Vec::new(),
            },
            section5: Section5 {
                num_points,
                template_number: 0,
                representation: DataRepresentation::Simple(Packing {
                    reference: 0.0,
                    binary_scale: 0,
                    decimal_scale: 0,
                    bits: 8,
                    field_type: 0,
                }),
            },
            section6: Section6 {
                bitmap_indicator: 255,
                bitmap: Vec::new(),
            },
            section7: Section7 { data },
        }
    }

    #[test]
    fn geo_filter_slices_the_grid_consistently() {
        let mut message = test_message(test_grid());
        apply_geo_filter(&mut message, &test_filter()).unwrap();

        // 11 columns by 6 rows.
        assert_eq!(message.section7.data.len(), 66);
        assert_eq!(message.section3.num_points, 66);
        assert_eq!(message.section5.num_points, 66);

        let Grid::LatLon(grid) = &message.section3.grid else {
            panic!("grid variant changed");
        };
        assert_eq!((grid.ni, grid.nj), (11, 6));
        assert_eq!(grid.lo1, 2_500_000);
        assert_eq!(grid.la1, 72_500_000);
        assert_eq!(grid.lo2, 27_500_000);
        assert_eq!(grid.la2, 60_000_000);

        // First sliced value is row 7, column 1 of the original grid.
        assert_eq!(message.section7.data[0], (7 * 144 + 1) as f64);
        assert_eq!(message.section7.data[65], (12 * 144 + 11) as f64);
    }

    #[test]
    fn geo_filter_rejects_non_lat_lon_grids() {
        let mut message = test_message(test_grid());
        message.section3.grid = Grid::Unknown(10);
        let err = apply_geo_filter(&mut message, &test_filter());
        assert!(matches!(err, Err(GribError::OperationError(_))));
    }

    #[test]
    fn average_over_monotonic_data() {
        let message = test_message(test_grid());
        let filter = GeoFilter {
            min_lat: 90_000_000,
            max_lat: 85_000_000,
            min_lon: 0,
            max_lon: 5_000_000,
        };
        // Rows 0..2, columns 0..2: values 0, 1, 144, 145.
        assert_eq!(average_value(&message, &filter).unwrap(), 72.5);
    }

    #[test]
    fn filter_on_discipline() {
        let mut other = test_message(test_grid());
        other.section0.discipline = 2;
        let messages = vec![test_message(test_grid()), other];

        let unfiltered = filter_messages(messages.clone(), &FilterOptions::default()).unwrap();
        assert_eq!(unfiltered.len(), 2);

        let filtered = filter_messages(
            messages,
            &FilterOptions {
                discipline: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].section0.discipline, 2);
    }

    #[test]
    fn filter_on_category_and_surface() {
        let mut heights = test_message(test_grid());
        heights.section4.product.parameter_category = 3;
        heights.section4.product.first_surface = Surface {
            surface_type: 100,
            scale: 0,
            value: 200,
        };
        let messages = vec![test_message(test_grid()), heights];

        let by_category = filter_messages(
            messages.clone(),
            &FilterOptions {
                category: Some(3),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_category.len(), 1);

        let by_surface = filter_messages(
            messages,
            &FilterOptions {
                surface: Some(Surface {
                    surface_type: 100,
                    scale: 0,
                    value: 200,
                }),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_surface.len(), 1);
        assert_eq!(by_surface[0].section4.product.parameter_category, 3);
    }

    #[test]
    fn message_limit_stops_early() {
        let messages = vec![
            test_message(test_grid()),
            test_message(test_grid()),
            test_message(test_grid()),
        ];
        let limited = filter_messages(
            messages,
            &FilterOptions {
                max_messages: Some(2),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(limited.len(), 2);
    }
}
