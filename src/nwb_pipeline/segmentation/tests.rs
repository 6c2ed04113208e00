#[cfg(test)]
mod tests {
    use std::ops::Range;

    use ndarray::{Array2, Array3};

    use crate::nwb_pipeline::common::error::{ConversionError, Result};
    use crate::nwb_pipeline::segmentation::{
        SegmentationExtractor, SessionLayout, SparseRoiMaskDecoder, TraceKind, VoxelMaskEntry,
    };
    use crate::nwb_pipeline::storage::{DatasetReader, MemoryStore};

    const NUM_FRAMES: usize = 6;

    /// Builds coordinate tables where ROI `r` has `pixel_counts[r]` voxels.
    /// Voxel `i` of ROI `r` sits at (r*1000 + i + 1, r*100 + i + 1, i % 29 + 1).
    fn coordinate_tables(max_pixels: usize, pixel_counts: &[usize], sentinel: f64) -> [Array2<f64>; 3] {
        let num_rois = pixel_counts.len();
        let mut x = Array2::from_elem((max_pixels, num_rois), sentinel);
        let mut y = Array2::from_elem((max_pixels, num_rois), sentinel);
        let mut z = Array2::from_elem((max_pixels, num_rois), sentinel);
        for (roi, &count) in pixel_counts.iter().enumerate() {
            for i in 0..count {
                x[[i, roi]] = (roi * 1000 + i + 1) as f64;
                y[[i, roi]] = (roi * 100 + i + 1) as f64;
                z[[i, roi]] = (i % 29 + 1) as f64;
            }
        }
        [x, y, z]
    }

    fn traces(num_rois: usize, offset: f64) -> Array2<f64> {
        Array2::from_shape_fn((NUM_FRAMES, num_rois), |(frame, roi)| offset + (frame * 10 + roi) as f64)
    }

    fn store(layout: SessionLayout, max_pixels: usize, pixel_counts: &[usize], sentinel: f64) -> MemoryStore {
        let config = layout.config();
        let [x, y, z] = coordinate_tables(max_pixels, pixel_counts, sentinel);
        let num_rois = pixel_counts.len();
        MemoryStore::new()
            .with_matrix(config.field_map.x, x)
            .with_matrix(config.field_map.y, y)
            .with_matrix(config.field_map.z, z)
            .with_matrix(config.baseline_key, traces(num_rois, 0.0))
            .with_matrix(config.timeseries_key, traces(num_rois, 0.5))
    }

    fn dual_color(pixel_counts: &[usize]) -> MemoryStore {
        store(SessionLayout::DualColor, 164, pixel_counts, 0.0)
    }

    #[test]
    fn test_decodes_valid_count_with_unit_weight() {
        let counts = [3, 0, 164, 1, 42];
        let decoder = SparseRoiMaskDecoder::open(dual_color(&counts)).unwrap();
        let masks = decoder.decode_pixel_masks(None).unwrap();

        assert_eq!(masks.len(), counts.len());
        for (mask, &count) in masks.iter().zip(&counts) {
            assert_eq!(mask.len(), count);
            assert!(mask.iter().all(|voxel| voxel.weight == 1.0));
        }
        assert_eq!(masks[0][2], VoxelMaskEntry::new(3, 3, 3));
        assert_eq!(masks[3][0], VoxelMaskEntry { x: 3001, y: 301, z: 1, weight: 1.0 });
    }

    #[test]
    fn test_sentinel_boundary_stops_at_first_zero() {
        let decoder = SparseRoiMaskDecoder::open(dual_color(&[42])).unwrap();
        assert_eq!(decoder.max_pixels_per_roi(), 164);

        let masks = decoder.decode_pixel_masks(Some(&[0])).unwrap();
        assert_eq!(masks[0].len(), 42);
        assert_eq!(masks[0].last().unwrap().x, 42);
    }

    #[test]
    fn test_full_column_uses_every_row() {
        let decoder = SparseRoiMaskDecoder::open(dual_color(&[164, 2])).unwrap();
        let masks = decoder.decode_pixel_masks(Some(&[0])).unwrap();
        assert_eq!(masks[0].len(), 164);
    }

    #[test]
    fn test_values_after_first_sentinel_are_ignored() {
        let mut store = dual_color(&[4]);
        let mut x = store.read_2d("x", 0..164, 0..1).unwrap();
        x[[2, 0]] = 0.0;
        store.insert_matrix("x", x);

        let decoder = SparseRoiMaskDecoder::open(store).unwrap();
        let masks = decoder.decode_pixel_masks(None).unwrap();
        assert_eq!(masks[0].len(), 2);
    }

    #[test]
    fn test_nan_sentinel_in_float_tables() {
        let decoder =
            SparseRoiMaskDecoder::open(store(SessionLayout::DualColor, 10, &[7, 0], f64::NAN)).unwrap();
        let masks = decoder.decode_pixel_masks(None).unwrap();
        assert_eq!(masks[0].len(), 7);
        assert!(masks[1].is_empty());
    }

    #[test]
    fn test_preserves_requested_order() {
        let counts: Vec<usize> = (0..12).map(|roi| roi % 5 + 1).collect();
        let decoder = SparseRoiMaskDecoder::open(dual_color(&counts)).unwrap();

        let masks = decoder.decode_pixel_masks(Some(&[5, 2, 9])).unwrap();
        let first_x: Vec<u32> = masks.iter().map(|mask| mask[0].x).collect();
        assert_eq!(first_x, vec![5001, 2001, 9001]);
        assert_eq!(masks[0].len(), 1);
        assert_eq!(masks[1].len(), 3);
        assert_eq!(masks[2].len(), 5);
    }

    #[test]
    fn test_repeated_decode_is_identical() {
        let decoder = SparseRoiMaskDecoder::open(dual_color(&[3, 8, 0, 1])).unwrap();
        let first = decoder.decode_pixel_masks(Some(&[3, 1])).unwrap();
        let second = decoder.decode_pixel_masks(Some(&[3, 1])).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_selection_means_all_rois() {
        let decoder = SparseRoiMaskDecoder::open(dual_color(&[1, 2, 3])).unwrap();
        let masks = decoder.decode_pixel_masks(Some(&[])).unwrap();
        assert_eq!(masks.len(), 3);
    }

    #[test]
    fn test_invalid_roi_fails_whole_call() {
        let decoder = SparseRoiMaskDecoder::open(dual_color(&[1, 2, 3])).unwrap();
        let result = decoder.decode_pixel_masks(Some(&[0, 3]));
        assert!(matches!(
            result,
            Err(ConversionError::InvalidRoiIdentifier { roi_id: 3, num_rois: 3 })
        ));
    }

    #[test]
    fn test_centroid_is_per_axis_median() {
        let decoder = SparseRoiMaskDecoder::open(dual_color(&[3, 4])).unwrap();
        let centroids = decoder.roi_centroid(None).unwrap();

        // odd count: middle voxel
        assert_eq!(centroids[0], [2.0, 2.0, 2.0]);
        // even count: mean of the two middle voxels
        assert_eq!(centroids[1], [1002.5, 102.5, 2.5]);
    }

    #[test]
    fn test_empty_roi_has_nan_centroid() {
        let decoder = SparseRoiMaskDecoder::open(dual_color(&[0, 2])).unwrap();
        let masks = decoder.decode_pixel_masks(Some(&[0])).unwrap();
        assert!(masks[0].is_empty());

        let centroids = decoder.roi_centroid(Some(&[0, 1])).unwrap();
        assert!(centroids[0].iter().all(|value| value.is_nan()));
        assert_eq!(centroids[1], [1001.5, 101.5, 1.5]);
    }

    #[test]
    fn test_layout_variants_decode_identically() {
        let counts = [5, 0, 12, 164];
        let dual = SparseRoiMaskDecoder::open(store(SessionLayout::DualColor, 164, &counts, 0.0)).unwrap();
        let single = SparseRoiMaskDecoder::open(store(SessionLayout::SingleColor, 164, &counts, 0.0)).unwrap();

        assert_eq!(dual.layout(), SessionLayout::DualColor);
        assert_eq!(single.layout(), SessionLayout::SingleColor);
        assert_eq!(dual.image_shape(), (2048, 2048, 29));
        assert_eq!(single.image_shape(), (888, 2048, 29));
        assert_eq!(
            dual.decode_pixel_masks(None).unwrap(),
            single.decode_pixel_masks(None).unwrap()
        );
    }

    #[test]
    fn test_half_precision_baseline_is_rejected() {
        let store = dual_color(&[3, 3]).with_matrix("baseline", Array2::zeros((1, 6)));
        let result = SparseRoiMaskDecoder::open(store);
        assert!(matches!(result, Err(ConversionError::CorruptedFormat(_))));

        let store = store_single_color_corrupted();
        let result = SegmentationExtractor::new(store, 1.56);
        assert!(matches!(result, Err(ConversionError::CorruptedFormat(_))));
    }

    fn store_single_color_corrupted() -> MemoryStore {
        store(SessionLayout::SingleColor, 8, &[2], 0.0).with_matrix("Cell_baseline", Array2::zeros((1, 6)))
    }

    #[test]
    fn test_mismatched_coordinate_tables_are_rejected() {
        let store = dual_color(&[3, 3]).with_matrix("z", Array2::zeros((10, 2)));
        let result = SparseRoiMaskDecoder::open(store);
        assert!(matches!(result, Err(ConversionError::InvalidShape { .. })));
    }

    #[test]
    fn test_fractional_coordinate_is_rejected() {
        let mut store = dual_color(&[2]);
        let mut y = store.read_2d("y", 0..164, 0..1).unwrap();
        y[[1, 0]] = 2.5;
        store.insert_matrix("y", y);

        let decoder = SparseRoiMaskDecoder::open(store).unwrap();
        let result = decoder.decode_pixel_masks(None);
        assert!(matches!(
            result,
            Err(ConversionError::InvalidCoordinate { roi_id: 0, .. })
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut decoder = SparseRoiMaskDecoder::open(dual_color(&[2])).unwrap();
        decoder.close().unwrap();
        decoder.close().unwrap();
        assert!(decoder.is_closed());
        assert!(matches!(
            decoder.decode_pixel_masks(None),
            Err(ConversionError::ReaderClosed)
        ));
    }

    #[test]
    fn test_extractor_traces() {
        let extractor = SegmentationExtractor::new(dual_color(&[1, 2, 3]), 2.0).unwrap();
        assert_eq!(extractor.num_frames(), NUM_FRAMES);
        assert_eq!(extractor.num_rois(), 3);
        assert_eq!(extractor.accepted_list(), vec![0, 1, 2]);
        assert!(extractor.rejected_list().is_empty());

        let raw = extractor.traces(TraceKind::Raw, 0..NUM_FRAMES, None).unwrap();
        assert_eq!(raw.shape(), &[NUM_FRAMES, 3]);
        assert_eq!(raw[[4, 2]], 42.0);

        let dff = extractor.traces(TraceKind::Dff, 1..3, Some(&[2, 0])).unwrap();
        assert_eq!(dff.shape(), &[2, 2]);
        assert_eq!(dff[[0, 0]], 12.5);
        assert_eq!(dff[[1, 1]], 20.5);
    }

    #[test]
    fn test_extractor_frame_slice_and_times() {
        let extractor = SegmentationExtractor::new(dual_color(&[1, 2]), 2.0).unwrap();
        assert_eq!(extractor.frame_to_time(0..3).unwrap(), vec![0.0, 0.5, 1.0]);

        let sliced = extractor.frame_slice(2, 5).unwrap();
        assert_eq!(sliced.num_frames(), 3);
        assert_eq!(sliced.frame_to_time(0..2).unwrap(), vec![1.0, 1.5]);

        let raw = sliced.traces(TraceKind::Raw, 0..1, None).unwrap();
        assert_eq!(raw[[0, 1]], 21.0);

        let result = sliced.traces(TraceKind::Raw, 0..4, None);
        assert!(matches!(result, Err(ConversionError::InvalidFrameRange { .. })));
    }

    #[test]
    fn test_extractor_explicit_times() {
        let mut extractor = SegmentationExtractor::new(dual_color(&[1]), 2.0).unwrap();
        assert!(extractor.set_times(vec![0.0; 3]).is_err());

        extractor
            .set_times(vec![0.1, 0.7, 1.3, 1.9, 2.5, 3.1])
            .unwrap();
        assert!(extractor.has_time_vector());
        assert_eq!(extractor.frame_to_time(1..3).unwrap(), vec![0.7, 1.3]);
    }

    #[test]
    fn test_extractor_rejects_bad_inputs() {
        assert!(matches!(
            SegmentationExtractor::new(dual_color(&[1]), 0.0),
            Err(ConversionError::InvalidSamplingFrequency(_))
        ));

        let store = dual_color(&[1, 1]).with_matrix("timeseries", Array2::zeros((NUM_FRAMES, 5)));
        assert!(matches!(
            SegmentationExtractor::new(store, 1.0),
            Err(ConversionError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_extractor_centroids_match_decoded_masks() {
        let extractor = SegmentationExtractor::new(dual_color(&[3, 0, 5]), 1.0).unwrap();
        let masks = extractor.roi_pixel_masks(None).unwrap();
        let from_masks = SegmentationExtractor::<MemoryStore>::mask_centroids(&masks);
        let from_file = extractor.roi_locations(None).unwrap();

        assert_eq!(from_masks[0], [2.0, 2.0, 2.0]);
        assert!(from_masks[1].iter().all(|v| v.is_nan()));
        assert_eq!(from_masks[2], from_file[2]);
        assert_eq!(from_masks[0], from_file[0]);
    }

    /// Reads like the wrapped store but refuses to close.
    struct StuckStore(MemoryStore);

    impl DatasetReader for StuckStore {
        fn contains(&self, name: &str) -> bool {
            self.0.contains(name)
        }

        fn shape(&self, name: &str) -> Result<Vec<usize>> {
            self.0.shape(name)
        }

        fn read_2d(&self, name: &str, rows: Range<usize>, cols: Range<usize>) -> Result<Array2<f64>> {
            self.0.read_2d(name, rows, cols)
        }

        fn read_flat(&self, name: &str) -> Result<Vec<f64>> {
            self.0.read_flat(name)
        }

        fn read_volume(&self, name: &str, rows: Range<usize>) -> Result<Array3<u16>> {
            self.0.read_volume(name, rows)
        }

        fn close(&mut self) -> Result<()> {
            Err(ConversionError::InputReadError("handle busy".to_string()))
        }
    }

    #[test]
    fn test_extractor_reports_shape_error_when_close_fails() {
        let store = dual_color(&[1, 1]).with_matrix("timeseries", Array2::zeros((NUM_FRAMES, 5)));
        let result = SegmentationExtractor::new(StuckStore(store), 1.0);
        match result {
            Err(ConversionError::InvalidShape { name, .. }) => assert_eq!(name, "timeseries"),
            Err(other) => panic!("expected InvalidShape, got {other}"),
            Ok(_) => panic!("expected InvalidShape"),
        }
    }
}
