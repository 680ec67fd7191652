use crate::solver::matrix::builder::MatrixBuilder;
use crate::solver::matrix::csc::CscMatrix;
use crate::solver::matrix::error::{MatrixError, MatrixMarketError};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MmField {
    Integer,
    Real,
}

/// Declared symmetry of a MatrixMarket coordinate file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmSymmetry {
    General,
    Symmetric,
    SkewSymmetric,
}

impl MmSymmetry {
    pub fn label(self) -> &'static str {
        match self {
            MmSymmetry::General => "general",
            MmSymmetry::Symmetric => "symmetric",
            MmSymmetry::SkewSymmetric => "skew-symmetric",
        }
    }
}

/// Load the lower triangle (row >= col) of a sparse matrix from a MatrixMarket `.mtx` file
/// (coordinate format) into a canonical CSC, along with the declared symmetry.
///
/// Supports `general`, `symmetric` and `skew-symmetric` declarations, all of which are
/// expected to store only entries with row >= col (1-based) — this engine never materializes
/// the upper triangle, so a `general` file is only accepted if it happens to already be
/// lower-triangular.
pub fn load_matrix_market_csc_file(
    path: impl AsRef<Path>,
) -> Result<(CscMatrix, MmSymmetry), MatrixError> {
    let f = File::open(path.as_ref()).map_err(MatrixMarketError::from)?;
    let reader = BufReader::new(f);
    load_matrix_market_csc_from_reader(reader)
}

/// Same as [`load_matrix_market_csc_file`], but reads from any buffered reader (useful for tests).
pub fn load_matrix_market_csc_from_reader<R: BufRead>(
    reader: R,
) -> Result<(CscMatrix, MmSymmetry), MatrixError> {
    let mut lines = reader.lines().enumerate();

    let (header_line_no, header) = loop {
        match lines.next() {
            None => {
                return Err(MatrixMarketError::InvalidBanner("empty input".to_string()).into());
            }
            Some((i, line)) => {
                let line = line.map_err(MatrixMarketError::from)?;
                let t = line.trim();
                if t.is_empty() {
                    continue;
                }
                let t = t.trim_start_matches('\u{feff}');
                break (i + 1, t.to_string());
            }
        }
    };

    let tokens: Vec<&str> = header.split_whitespace().collect();
    if tokens.len() != 5 {
        return Err(MatrixMarketError::InvalidBanner(format!(
            "expected 5 tokens, got {} at line {}: {:?}",
            tokens.len(),
            header_line_no,
            header
        ))
        .into());
    }

    let mm = tokens[0];
    let object = tokens[1].to_ascii_lowercase();
    let format = tokens[2].to_ascii_lowercase();
    let field = tokens[3].to_ascii_lowercase();
    let symmetry_token = tokens[4].to_ascii_lowercase();

    if mm != "%%MatrixMarket" {
        return Err(MatrixMarketError::InvalidBanner(format!(
            "missing %%MatrixMarket at line {}: {}",
            header_line_no, header
        ))
        .into());
    }
    if object != "matrix" || format != "coordinate" {
        return Err(MatrixMarketError::UnsupportedType(format!(
            "only 'matrix coordinate' is supported, got '{}' '{}' (line {}): {}",
            tokens[1], tokens[2], header_line_no, header
        ))
        .into());
    }

    let symmetry = match symmetry_token.as_str() {
        "general" => MmSymmetry::General,
        "symmetric" => MmSymmetry::Symmetric,
        "skew-symmetric" => MmSymmetry::SkewSymmetric,
        other => {
            return Err(MatrixMarketError::UnsupportedType(format!(
                "unsupported symmetry '{}' (line {}): {}",
                other, header_line_no, header
            ))
            .into());
        }
    };

    let field = match field.as_str() {
        "integer" => MmField::Integer,
        "real" => MmField::Real,
        other => {
            return Err(MatrixMarketError::UnsupportedType(format!(
                "only 'integer' and 'real' fields are supported, got '{}' (line {}): {}",
                other, header_line_no, header
            ))
            .into());
        }
    };

    let (size_line_no, size_line) = loop {
        match lines.next() {
            None => {
                return Err(
                    MatrixMarketError::InvalidSizeLine("missing size line".to_string()).into(),
                );
            }
            Some((i, line)) => {
                let line = line.map_err(MatrixMarketError::from)?;
                let t = line.trim();
                if t.is_empty() || t.starts_with('%') {
                    continue;
                }
                break (i + 1, t.to_string());
            }
        }
    };

    let parts: Vec<&str> = size_line.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(MatrixMarketError::InvalidSizeLine(format!(
            "expected 3 integers at line {}: {}",
            size_line_no, size_line
        ))
        .into());
    }
    let nrows: usize = parts[0].parse().map_err(|e| {
        MatrixMarketError::InvalidSizeLine(format!(
            "bad nrows '{}' at line {}: {} ({})",
            parts[0], size_line_no, size_line, e
        ))
    })?;
    let ncols: usize = parts[1].parse().map_err(|e| {
        MatrixMarketError::InvalidSizeLine(format!(
            "bad ncols '{}' at line {}: {} ({})",
            parts[1], size_line_no, size_line, e
        ))
    })?;
    let nnz: usize = parts[2].parse().map_err(|e| {
        MatrixMarketError::InvalidSizeLine(format!(
            "bad nnz '{}' at line {}: {} ({})",
            parts[2], size_line_no, size_line, e
        ))
    })?;

    if nrows != ncols {
        return Err(MatrixMarketError::NotSquare {
            rows: nrows,
            cols: ncols,
        }
        .into());
    }

    let mut b = MatrixBuilder::new(nrows, ncols);
    b.reserve(nnz);

    let mut read_entries = 0usize;
    for (i, line) in lines {
        let line_no = i + 1;
        let line = line.map_err(MatrixMarketError::from)?;
        let t = line.trim();
        if t.is_empty() || t.starts_with('%') {
            continue;
        }
        if read_entries >= nnz {
            return Err(MatrixMarketError::InvalidEntry {
                line: line_no,
                msg: format!("found more than nnz={} entries", nnz),
            }
            .into());
        }

        let parts: Vec<&str> = t.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(MatrixMarketError::InvalidEntry {
                line: line_no,
                msg: format!("expected 3 tokens 'row col val', got: {}", t),
            }
            .into());
        }

        let row_1: usize = parts[0]
            .parse()
            .map_err(|e| MatrixMarketError::InvalidEntry {
                line: line_no,
                msg: format!("bad row index '{}': {}", parts[0], e),
            })?;
        let col_1: usize = parts[1]
            .parse()
            .map_err(|e| MatrixMarketError::InvalidEntry {
                line: line_no,
                msg: format!("bad col index '{}': {}", parts[1], e),
            })?;

        if row_1 == 0 || col_1 == 0 {
            return Err(MatrixMarketError::InvalidEntry {
                line: line_no,
                msg: "MatrixMarket indices are 1-based; found 0".to_string(),
            }
            .into());
        }

        let row = row_1 - 1;
        let col = col_1 - 1;

        if row < col {
            return Err(MatrixMarketError::AboveDiagonalEntry {
                line: line_no,
                row,
                col,
                symmetry: symmetry.label().to_string(),
            }
            .into());
        }

        let val = match field {
            MmField::Integer => {
                let v: i64 = parts[2]
                    .parse()
                    .map_err(|e| MatrixMarketError::InvalidEntry {
                        line: line_no,
                        msg: format!("bad integer value '{}': {}", parts[2], e),
                    })?;
                v as f64
            }
            MmField::Real => {
                let v: f64 = parts[2]
                    .parse()
                    .map_err(|e| MatrixMarketError::InvalidEntry {
                        line: line_no,
                        msg: format!("bad real value '{}': {}", parts[2], e),
                    })?;
                v
            }
        };

        b.push(col, row, val)?;
        read_entries += 1;
    }

    if read_entries != nnz {
        return Err(MatrixMarketError::EntryCountMismatch {
            expected: nnz,
            actual: read_entries,
        }
        .into());
    }

    Ok((b.build_csc()?, symmetry))
}

/// Write a (lower-triangular-only) matrix out in MatrixMarket coordinate real general format.
/// `upper_mirror` controls whether entries above the diagonal are synthesized on write
/// (multiplying by `sign`) so that generic MatrixMarket readers see the full matrix.
pub fn write_matrix_market_csc(
    mut w: impl Write,
    a: &CscMatrix,
    sign: f64,
    upper_mirror: bool,
) -> std::io::Result<()> {
    let mut entries: Vec<(usize, usize, f64)> =
        Vec::with_capacity(a.nnz() * if upper_mirror { 2 } else { 1 });
    for j in 0..a.dim.ncols {
        let (rows, vals) = a.col(j);
        for (&i, &v) in rows.iter().zip(vals.iter()) {
            entries.push((i, j, v));
            if upper_mirror && i != j {
                entries.push((j, i, sign * v));
            }
        }
    }

    writeln!(w, "%%MatrixMarket matrix coordinate real general")?;
    writeln!(w, "{} {} {}", a.dim.nrows, a.dim.ncols, entries.len())?;
    for (row, col, val) in entries {
        writeln!(w, "{} {} {:.17e}", row + 1, col + 1, val)?;
    }
    Ok(())
}

/// Write a dense vector (e.g. a solution) as a MatrixMarket array.
pub fn write_matrix_market_vector(mut w: impl Write, x: &[f64]) -> std::io::Result<()> {
    writeln!(w, "%%MatrixMarket matrix array real general")?;
    writeln!(w, "{} 1", x.len())?;
    for v in x {
        writeln!(w, "{:.17e}", v)?;
    }
    Ok(())
}

/// Load a dense right-hand-side vector from a MatrixMarket array file (`n x 1`).
pub fn load_matrix_market_vector_file(path: impl AsRef<Path>) -> Result<Vec<f64>, MatrixError> {
    let f = File::open(path.as_ref()).map_err(MatrixMarketError::from)?;
    load_matrix_market_vector_from_reader(BufReader::new(f))
}

/// Same as [`load_matrix_market_vector_file`], but reads from any buffered reader.
pub fn load_matrix_market_vector_from_reader<R: BufRead>(reader: R) -> Result<Vec<f64>, MatrixError> {
    let mut lines = reader.lines().enumerate();

    let (header_line_no, header) = loop {
        match lines.next() {
            None => return Err(MatrixMarketError::InvalidBanner("empty input".to_string()).into()),
            Some((i, line)) => {
                let line = line.map_err(MatrixMarketError::from)?;
                let t = line.trim();
                if t.is_empty() {
                    continue;
                }
                break (i + 1, t.to_string());
            }
        }
    };
    let tokens: Vec<&str> = header.split_whitespace().collect();
    if tokens.len() != 5 || tokens[0] != "%%MatrixMarket" || tokens[1].to_ascii_lowercase() != "matrix" || tokens[2].to_ascii_lowercase() != "array" {
        return Err(MatrixMarketError::InvalidBanner(format!(
            "expected a 'matrix array' banner at line {}: {:?}",
            header_line_no, header
        ))
        .into());
    }

    let (size_line_no, size_line) = loop {
        match lines.next() {
            None => return Err(MatrixMarketError::InvalidSizeLine("missing size line".to_string()).into()),
            Some((i, line)) => {
                let line = line.map_err(MatrixMarketError::from)?;
                let t = line.trim();
                if t.is_empty() || t.starts_with('%') {
                    continue;
                }
                break (i + 1, t.to_string());
            }
        }
    };
    let parts: Vec<&str> = size_line.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(MatrixMarketError::InvalidSizeLine(format!(
            "expected 2 tokens at line {}: {:?}",
            size_line_no, size_line
        ))
        .into());
    }
    let n: usize = parts[0]
        .parse()
        .map_err(|_| MatrixMarketError::InvalidSizeLine(size_line.clone()))?;

    let mut x = Vec::with_capacity(n);
    for (i, line) in lines {
        let line = line.map_err(MatrixMarketError::from)?;
        let t = line.trim();
        if t.is_empty() {
            continue;
        }
        let v: f64 = t.parse().map_err(|_| MatrixMarketError::InvalidEntry {
            line: i + 1,
            msg: format!("not a real number: {t:?}"),
        })?;
        x.push(v);
    }

    if x.len() != n {
        return Err(MatrixMarketError::EntryCountMismatch {
            expected: n,
            actual: x.len(),
        }
        .into());
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_small_integer_coordinate_general_lower_triangle() {
        let mtx = r#"
%%MatrixMarket matrix coordinate integer general
% a comment
3 3 3
1 1 2
3 1 4
3 3 5
"#;

        let (a, symmetry) = load_matrix_market_csc_from_reader(Cursor::new(mtx)).unwrap();
        assert_eq!(symmetry, MmSymmetry::General);
        debug_assert!(a.check_invariants().is_ok());
        assert_eq!(a.dim.nrows, 3);
        assert_eq!(a.nnz(), 3);
    }

    #[test]
    fn parses_symmetric_and_skew_symmetric_declarations() {
        let sym = r#"%%MatrixMarket matrix coordinate real symmetric
2 2 2
1 1 4.0
2 1 1.0
"#;
        let (a, symmetry) = load_matrix_market_csc_from_reader(Cursor::new(sym)).unwrap();
        assert_eq!(symmetry, MmSymmetry::Symmetric);
        assert_eq!(a.nnz(), 2);

        let skew = r#"%%MatrixMarket matrix coordinate real skew-symmetric
3 3 2
2 1 1.0
3 2 1.0
"#;
        let (a, symmetry) = load_matrix_market_csc_from_reader(Cursor::new(skew)).unwrap();
        assert_eq!(symmetry, MmSymmetry::SkewSymmetric);
        assert_eq!(a.nnz(), 2);
    }

    #[test]
    fn rejects_above_diagonal_entry() {
        let mtx = r#"%%MatrixMarket matrix coordinate integer general
2 2 1
1 2 1
"#;
        let err = load_matrix_market_csc_from_reader(Cursor::new(mtx)).unwrap_err();
        let s = format!("{err}");
        assert!(s.contains("above the diagonal"));
    }

    #[test]
    fn rejects_non_square() {
        let mtx = r#"%%MatrixMarket matrix coordinate integer general
2 3 0
"#;
        let err = load_matrix_market_csc_from_reader(Cursor::new(mtx)).unwrap_err();
        let s = format!("{err}");
        assert!(s.contains("not square"));
    }

    #[test]
    fn write_then_read_round_trips_lower_triangle() {
        let mut b = MatrixBuilder::new(3, 3);
        b.push(0, 0, 2.0).unwrap();
        b.push(0, 2, 1.5).unwrap();
        b.push(2, 2, 4.0).unwrap();
        let a = b.build_csc().unwrap();

        let mut buf = Vec::new();
        write_matrix_market_csc(&mut buf, &a, 1.0, false).unwrap();
        let (read_back, symmetry) = load_matrix_market_csc_from_reader(Cursor::new(buf)).unwrap();
        assert_eq!(symmetry, MmSymmetry::General);
        assert_eq!(read_back.nnz(), a.nnz());
    }

    #[test]
    fn write_then_read_vector_round_trips() {
        let x = vec![1.5, -2.25, 3.0];
        let mut buf = Vec::new();
        write_matrix_market_vector(&mut buf, &x).unwrap();
        let read_back = load_matrix_market_vector_from_reader(Cursor::new(buf)).unwrap();
        assert_eq!(read_back, x);
    }

    #[test]
    fn vector_load_rejects_entry_count_mismatch() {
        let mtx = "%%MatrixMarket matrix array real general\n3 1\n1.0\n2.0\n";
        let err = load_matrix_market_vector_from_reader(Cursor::new(mtx)).unwrap_err();
        assert!(matches!(
            err,
            MatrixError::MatrixMarket(MatrixMarketError::EntryCountMismatch { expected: 3, actual: 2 })
        ));
    }
}
