use jxl_aux::bitio::{BitWriter, Bitstream};
use jxl_aux::splines::{Error, Point, QuantizedSpline, Spline, Splines};

const QUANTIZATION_ADJUSTMENT: i32 = 0;
const Y_TO_X: f32 = 0.0;
const Y_TO_B: f32 = 1.0;
const TOLERANCE: f32 = 0.003125;
// Hard cap on the estimated area regardless of image size.
const AREA_BUDGET: u64 = 1 << 42;

fn dct32(values: &[f32]) -> [f32; 32] {
    let mut out = [0f32; 32];
    out[..values.len()].copy_from_slice(values);
    out
}

fn points(coords: &[(f32, f32)]) -> Vec<Point> {
    coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
}

fn test_splines() -> Vec<Spline> {
    vec![
        Spline {
            control_points: points(&[
                (109.0, 54.0),
                (218.0, 159.0),
                (80.0, 3.0),
                (110.0, 274.0),
                (94.0, 185.0),
                (17.0, 277.0),
            ]),
            color_dct: [
                dct32(&[
                    36.3, 39.7, 23.2, 67.5, 4.4, 71.5, 62.3, 32.3, 92.2, 10.1, 10.8, 9.2, 6.1,
                    10.5, 79.1, 7.0, 24.6, 90.8, 5.5, 84.0, 43.8, 49.0, 33.5, 78.9, 54.5, 77.9,
                    62.1, 51.4, 36.4, 14.3, 83.7, 35.4,
                ]),
                dct32(&[
                    9.4, 53.4, 9.5, 74.9, 72.7, 26.7, 7.9, 0.9, 84.9, 23.2, 26.5, 31.1, 91.0,
                    11.7, 74.1, 39.3, 23.7, 82.5, 4.8, 2.7, 61.2, 96.4, 13.7, 66.7, 62.9, 82.4,
                    5.9, 98.7, 21.5, 7.9, 51.7, 63.1,
                ]),
                dct32(&[
                    48.0, 39.3, 6.9, 26.3, 33.3, 6.2, 1.7, 98.9, 59.9, 59.6, 95.0, 61.3, 82.7,
                    53.0, 6.1, 30.4, 34.7, 96.9, 93.4, 17.0, 38.8, 80.8, 63.0, 18.6, 43.6, 32.3,
                    61.0, 20.2, 24.3, 28.3, 69.1, 62.4,
                ]),
            ],
            sigma_dct: dct32(&[
                32.7, 21.5, 44.4, 1.8, 45.8, 90.6, 29.3, 59.2, 23.7, 85.2, 84.8, 27.2, 42.1,
                84.1, 50.6, 17.6, 93.7, 4.9, 2.6, 69.8, 94.9, 52.0, 24.3, 18.8, 12.1, 95.7,
                28.5, 81.4, 89.9, 31.4, 74.8, 52.0,
            ]),
        },
        Spline {
            control_points: points(&[
                (172.0, 309.0),
                (196.0, 277.0),
                (42.0, 238.0),
                (114.0, 350.0),
                (307.0, 290.0),
                (316.0, 269.0),
                (124.0, 66.0),
                (233.0, 267.0),
            ]),
            color_dct: [
                dct32(&[
                    15.0, 28.9, 22.0, 6.6, 41.8, 83.0, 8.6, 56.8, 68.9, 9.7, 5.4, 19.8, 70.8,
                    90.0, 52.5, 65.2, 7.8, 23.5, 26.4, 72.2, 64.7, 87.1, 1.3, 67.5, 46.0, 68.4,
                    65.4, 35.5, 29.1, 13.0, 41.6, 23.9,
                ]),
                dct32(&[
                    47.7, 79.4, 62.7, 29.1, 96.8, 18.5, 17.6, 15.2, 80.5, 56.0, 96.2, 59.9, 26.7,
                    96.1, 92.3, 42.1, 35.8, 54.0, 23.2, 55.0, 76.0, 35.8, 58.4, 88.7, 2.4, 78.1,
                    95.6, 27.5, 6.6, 78.5, 24.1, 69.8,
                ]),
                dct32(&[
                    43.8, 96.5, 0.9, 95.1, 49.1, 71.2, 25.1, 33.6, 75.2, 95.0, 82.1, 19.7, 10.5,
                    44.9, 50.0, 93.3, 83.5, 99.5, 64.6, 54.0, 3.5, 99.7, 45.3, 82.1, 22.4, 37.9,
                    60.0, 32.2, 12.6, 4.6, 65.5, 96.4,
                ]),
            ],
            sigma_dct: dct32(&[
                72.5, 2.6, 41.7, 2.2, 39.7, 79.1, 69.6, 19.9, 92.3, 71.5, 41.9, 62.1, 30.0,
                49.4, 70.3, 45.3, 62.5, 47.2, 46.7, 41.2, 90.8, 46.8, 91.2, 55.0, 8.1, 69.6,
                25.4, 84.7, 61.7, 27.6, 3.7, 46.9,
            ]),
        },
        Spline {
            control_points: points(&[
                (100.0, 186.0),
                (257.0, 97.0),
                (170.0, 49.0),
                (25.0, 169.0),
                (309.0, 104.0),
                (232.0, 237.0),
                (385.0, 101.0),
                (122.0, 168.0),
                (26.0, 300.0),
                (390.0, 88.0),
            ]),
            color_dct: [
                dct32(&[
                    16.9, 64.8, 4.2, 10.6, 23.5, 17.0, 79.3, 5.7, 60.4, 16.6, 94.9, 63.7, 87.6,
                    10.5, 3.8, 61.1, 22.9, 81.9, 80.4, 40.5, 45.9, 25.4, 39.8, 30.0, 50.2, 90.4,
                    27.9, 93.7, 65.1, 48.2, 22.3, 43.9,
                ]),
                dct32(&[
                    24.9, 66.0, 3.5, 90.2, 97.1, 15.8, 35.6, 0.6, 68.0, 39.6, 24.4, 85.9, 57.7,
                    77.6, 47.5, 67.9, 4.3, 5.4, 91.2, 58.5, 0.1, 52.2, 3.5, 47.8, 63.2, 43.5,
                    85.8, 35.8, 50.2, 35.9, 19.2, 48.2,
                ]),
                dct32(&[
                    82.8, 44.9, 76.4, 39.5, 94.1, 14.3, 89.8, 10.0, 10.5, 74.5, 56.3, 65.8, 7.8,
                    23.3, 52.8, 99.3, 56.8, 46.0, 76.7, 13.5, 67.0, 22.4, 29.9, 43.3, 70.3, 26.0,
                    74.3, 53.9, 62.0, 19.1, 49.3, 46.7,
                ]),
            ],
            sigma_dct: dct32(&[
                83.5, 1.7, 25.1, 18.7, 46.5, 75.3, 28.0, 62.3, 50.3, 23.3, 85.6, 96.0, 45.8,
                33.1, 33.4, 52.9, 26.3, 58.5, 19.6, 70.0, 92.6, 22.5, 57.0, 21.6, 76.8, 87.5,
                22.9, 66.3, 35.7, 35.6, 56.8, 67.2,
            ]),
        },
    ]
}

fn quantize(spline_data: &[Spline]) -> Splines {
    let mut quantized = Vec::new();
    let mut starting_points = Vec::new();
    for spline in spline_data {
        quantized.push(
            QuantizedSpline::create(spline, QUANTIZATION_ADJUSTMENT, Y_TO_X, Y_TO_B).unwrap(),
        );
        starting_points.push(spline.control_points[0]);
    }
    Splines::new(QUANTIZATION_ADJUSTMENT, quantized, starting_points)
}

fn dequantize(splines: &Splines) -> Vec<Spline> {
    let mut total = 0u64;
    splines
        .splines
        .iter()
        .zip(&splines.starting_points)
        .map(|(spline, &start)| {
            spline
                .dequantize(
                    start,
                    splines.quantization_adjustment,
                    Y_TO_X,
                    Y_TO_B,
                    AREA_BUDGET,
                    &mut total,
                )
                .unwrap()
        })
        .collect()
}

#[test]
fn serialization() {
    let spline_data = test_splines();
    let splines = quantize(&spline_data);

    let quantized_spline_data = dequantize(&splines);
    assert_eq!(quantized_spline_data.len(), spline_data.len());
    for (i, (actual, expected)) in quantized_spline_data.iter().zip(&spline_data).enumerate() {
        assert_eq!(actual.control_points.len(), expected.control_points.len());
        for (j, (a, e)) in actual
            .control_points
            .iter()
            .zip(&expected.control_points)
            .enumerate()
        {
            assert!(
                (a.x - e.x).abs() <= TOLERANCE && (a.y - e.y).abs() <= TOLERANCE,
                "spline {} point {}",
                i,
                j,
            );
        }
    }

    let mut writer = BitWriter::new();
    splines.encode(&mut writer).unwrap();
    let bits_written = writer.num_written_bits();
    let buf = writer.finish();

    let mut bitstream = Bitstream::new(&buf);
    let decoded_splines = Splines::decode(&mut bitstream, 1000).unwrap();
    assert_eq!(bitstream.num_read_bits(), bits_written);

    let decoded_spline_data = dequantize(&decoded_splines);
    assert_eq!(decoded_spline_data.len(), quantized_spline_data.len());
    for (actual, expected) in decoded_spline_data.iter().zip(&quantized_spline_data) {
        assert_eq!(actual.control_points.len(), expected.control_points.len());
        for (a, e) in actual.control_points.iter().zip(&expected.control_points) {
            assert!((a.x - e.x).abs() <= TOLERANCE);
            assert!((a.y - e.y).abs() <= TOLERANCE);
        }
        for (a, e) in actual.color_dct.iter().zip(&expected.color_dct) {
            for (a, e) in a.iter().zip(e) {
                assert!((a - e).abs() <= TOLERANCE);
            }
        }
        for (a, e) in actual.sigma_dct.iter().zip(&expected.sigma_dct) {
            assert!((a - e).abs() <= TOLERANCE);
        }
    }
}

#[test]
fn too_many_splines() {
    // More than the limit for 1000 pixels.
    let num_splines = 300;
    let spline_data: Vec<Spline> = (0..num_splines)
        .map(|i| Spline {
            control_points: points(&[
                (1.0 + i as f32, 2.0),
                (10.0 + i as f32, 25.0),
                (30.0 + i as f32, 300.0),
            ]),
            color_dct: [
                dct32(&[1.0, 0.2, 0.1]),
                dct32(&[35.7, 10.3]),
                dct32(&[35.7, 7.8]),
            ],
            sigma_dct: dct32(&[10.0, 0.0, 0.0, 2.0]),
        })
        .collect();
    let splines = quantize(&spline_data);

    let mut writer = BitWriter::new();
    splines.encode(&mut writer).unwrap();
    let buf = writer.finish();

    let mut bitstream = Bitstream::new(&buf);
    assert!(matches!(
        Splines::decode(&mut bitstream, 1000),
        Err(Error::TooManySplines(300)),
    ));
}

#[test]
fn duplicate_points() {
    let spline = Spline {
        control_points: points(&[
            (9.0, 54.0),
            (118.0, 159.0),
            (97.0, 3.0),
            (97.0, 3.0), // Repeated.
            (10.0, 40.0),
            (150.0, 25.0),
            (120.0, 300.0),
        ]),
        color_dct: [
            dct32(&[1.0, 0.2, 0.1]),
            dct32(&[35.7, 10.3]),
            dct32(&[35.7, 7.8]),
        ],
        sigma_dct: dct32(&[10.0, 0.0, 0.0, 2.0]),
    };
    assert!(matches!(
        QuantizedSpline::create(&spline, QUANTIZATION_ADJUSTMENT, Y_TO_X, Y_TO_B),
        Err(Error::DuplicateControlPoints),
    ));
}
