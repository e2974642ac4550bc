use geo::Coord;

/// Cuts `points` into batches of `batch_size` points. Every batch after the first is prefixed with the last point of
/// the batch before it, so routed geometries share a coordinate at each seam.
pub fn overlapping_batches(points: &[Coord<f64>], batch_size: usize) -> Vec<Vec<Coord<f64>>> {
    let batch_size = batch_size.max(1);
    let mut batches: Vec<Vec<Coord<f64>>> = Vec::with_capacity(points.len().div_ceil(batch_size));

    for chunk in points.chunks(batch_size) {
        let mut batch = Vec::with_capacity(chunk.len() + 1);
        if let Some(seam) = batches.last().and_then(|previous| previous.last()) {
            batch.push(*seam);
        }
        batch.extend_from_slice(chunk);
        batches.push(batch);
    }

    batches
}

/// Concatenates lines in order, dropping the first coordinate of a line when it repeats the last one written.
pub fn stitch(lines: Vec<Vec<Coord<f64>>>) -> Vec<Coord<f64>> {
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(lines.iter().map(Vec::len).sum());

    for line in lines {
        let skip = match (coords.last(), line.first()) {
            (Some(last), Some(first)) if last == first => 1,
            _ => 0,
        };
        coords.extend(line.into_iter().skip(skip));
    }

    coords
}
