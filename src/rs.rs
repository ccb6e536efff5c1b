//! Reed-Solomon error correction decoder
//!
//! One decoder serves every symbology; the field (prime or binary
//! extension) is passed in. The algorithm is the classic chain:
//! syndromes, extended Euclidean key-equation solver, Chien search for
//! error locations, Forney formula for magnitudes.
//!
//! Corrections happen in place on the codeword slice. Up to
//! ⌊ec_count/2⌋ symbol errors are corrected; anything beyond that is
//! reported as a checksum failure, never a panic.

use crate::gf::{GaloisField, GfPoly};

/// Why a Reed-Solomon decode failed. All variants surface to the caller
/// as a checksum error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsError {
    /// The Euclidean algorithm terminated without solving the key equation.
    KeyEquation,
    /// Chien search found fewer roots than the locator degree.
    Locations,
    /// An error location fell outside the codeword.
    BadLocation,
}

/// Correct `codewords` in place against `ec_count` trailing error
/// correction codewords. Returns the number of corrected symbols.
pub fn reed_solomon_decode(
    field: &GaloisField,
    codewords: &mut [u32],
    ec_count: usize,
) -> Result<usize, RsError> {
    debug_assert!(ec_count <= codewords.len());

    let poly = GfPoly::new(field, codewords.to_vec());
    let mut syndromes = vec![0u32; ec_count];
    let mut has_error = false;
    let base = field.generator_base();
    for i in 0..ec_count {
        // Highest syndrome first, matching the Euclidean input order.
        let eval = poly.evaluate_at(field.exp(base + (ec_count - 1 - i) as u32));
        syndromes[i] = eval;
        has_error |= eval != 0;
    }
    if !has_error {
        return Ok(0);
    }

    let syndrome = GfPoly::new(field, syndromes);
    let (sigma, omega) = run_euclidean_algorithm(
        field,
        GfPoly::monomial(field, ec_count, 1),
        syndrome,
        ec_count,
    )?;

    let locations = find_error_locations(field, &sigma)?;
    let magnitudes = find_error_magnitudes(field, &omega, &sigma, &locations);

    let n = codewords.len();
    for (i, &loc) in locations.iter().enumerate() {
        let log = field.log(loc) as usize;
        if log + 1 > n {
            return Err(RsError::BadLocation);
        }
        let position = n - 1 - log;
        codewords[position] = field.sub(codewords[position], magnitudes[i]);
    }
    Ok(locations.len())
}

/// Extended Euclidean algorithm on (a, b), terminating when the remainder
/// degree drops below `r / 2`. Returns (sigma, omega) normalised so that
/// sigma(0) = 1.
fn run_euclidean_algorithm<'a>(
    field: &'a GaloisField,
    a: GfPoly<'a>,
    b: GfPoly<'a>,
    r: usize,
) -> Result<(GfPoly<'a>, GfPoly<'a>), RsError> {
    let (mut r_last, mut r_cur) = if a.degree() < b.degree() { (b, a) } else { (a, b) };
    let mut t_last = GfPoly::zero(field);
    let mut t_cur = GfPoly::one(field);

    while r_cur.degree() >= r / 2 {
        let r_last_last = r_last.clone();
        let t_last_last = t_last.clone();
        r_last = r_cur.clone();
        t_last = t_cur.clone();

        if r_last.is_zero() {
            // Division by zero polynomial: the syndrome was degenerate.
            return Err(RsError::KeyEquation);
        }
        let mut remainder = r_last_last;
        let mut quotient = GfPoly::zero(field);
        let denominator_lead = r_last.coefficient(r_last.degree());
        let dlt_inverse = field.inv(denominator_lead);
        while remainder.degree() >= r_last.degree() && !remainder.is_zero() {
            let degree_diff = remainder.degree() - r_last.degree();
            let scale = field.mul(remainder.coefficient(remainder.degree()), dlt_inverse);
            quotient = quotient.add(&GfPoly::monomial(field, degree_diff, scale));
            remainder = remainder.subtract(&r_last.multiply_by_monomial(degree_diff, scale));
        }
        r_cur = remainder;
        t_cur = quotient.multiply(&t_last).subtract(&t_last_last).negative();
    }

    let sigma_at_zero = t_cur.coefficient(0);
    if sigma_at_zero == 0 {
        return Err(RsError::KeyEquation);
    }
    let inverse = field.inv(sigma_at_zero);
    let sigma = t_cur.multiply_scalar(inverse);
    let omega = r_cur.multiply_scalar(inverse);
    Ok((sigma, omega))
}

/// Chien search: every field element is tried as a root of sigma. The
/// number of roots must equal sigma's degree.
fn find_error_locations(field: &GaloisField, sigma: &GfPoly<'_>) -> Result<Vec<u32>, RsError> {
    let num_errors = sigma.degree();
    let mut locations = Vec::with_capacity(num_errors);
    for i in 1..field.size() {
        if locations.len() >= num_errors {
            break;
        }
        if sigma.evaluate_at(i) == 0 {
            locations.push(field.inv(i));
        }
    }
    if locations.len() != num_errors {
        return Err(RsError::Locations);
    }
    Ok(locations)
}

/// Forney formula: magnitude at location β is -β^(1-b) ω(β⁻¹) / σ'(β⁻¹),
/// where b is the field's generator base (the β power vanishes for b = 1).
fn find_error_magnitudes(
    field: &GaloisField,
    omega: &GfPoly<'_>,
    sigma: &GfPoly<'_>,
    locations: &[u32],
) -> Vec<u32> {
    let degree = sigma.degree();
    let mut derivative_coefficients = vec![0u32; degree];
    for i in 1..=degree {
        // Formal derivative: coefficient i becomes i * c_i (i summed in
        // the field, which collapses to parity in GF(2^n)).
        let mut times = 0;
        for _ in 0..i {
            times = field.add(times, sigma.coefficient(i));
        }
        derivative_coefficients[degree - i] = times;
    }
    let derivative = GfPoly::new(field, derivative_coefficients);

    let base = field.generator_base();
    locations
        .iter()
        .map(|&loc| {
            let x_inverse = field.inv(loc);
            let mut numerator = field.neg(omega.evaluate_at(x_inverse));
            if base == 0 {
                numerator = field.mul(numerator, loc);
            }
            let denominator = derivative.evaluate_at(x_inverse);
            if denominator == 0 {
                0
            } else {
                field.mul(numerator, field.inv(denominator))
            }
        })
        .collect()
}

// ============================================================================
// Encoding (tests and synthetic fixtures only)
// ============================================================================

/// Append `ec_count` Reed-Solomon parity codewords to `data`. The library
/// never writes symbols; this exists so tests can build valid codeword
/// streams to corrupt.
pub fn reed_solomon_encode(field: &GaloisField, data: &[u32], ec_count: usize) -> Vec<u32> {
    let mut generator = GfPoly::one(field);
    let base = field.generator_base();
    for i in 0..ec_count {
        let root = GfPoly::new(field, vec![1, field.neg(field.exp(base + i as u32))]);
        generator = generator.multiply(&root);
    }

    let info = GfPoly::new(field, data.to_vec()).multiply_by_monomial(ec_count, 1);
    // Remainder of info / generator is the parity block (negated).
    let mut remainder = info;
    let denominator_lead = generator.coefficient(generator.degree());
    let dlt_inverse = field.inv(denominator_lead);
    while remainder.degree() >= generator.degree() && !remainder.is_zero() {
        let degree_diff = remainder.degree() - generator.degree();
        let scale = field.mul(remainder.coefficient(remainder.degree()), dlt_inverse);
        remainder = remainder.subtract(&generator.multiply_by_monomial(degree_diff, scale));
    }

    let mut out = data.to_vec();
    for i in (0..ec_count).rev() {
        out.push(field.neg(remainder.coefficient(i)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gf::{gf113, gf256_data_matrix, gf256_qr, gf64, gf929};

    fn round_trip(field: &GaloisField, data: &[u32], ec: usize, corrupt: &[(usize, u32)]) {
        let clean = reed_solomon_encode(field, data, ec);
        let mut received = clean.clone();
        for &(pos, value) in corrupt {
            received[pos] = value;
        }
        let fixed = reed_solomon_decode(field, &mut received, ec).unwrap();
        assert_eq!(received, clean);
        assert_eq!(fixed, corrupt.len());
    }

    #[test]
    fn test_no_errors() {
        let field = gf256_qr();
        let mut codewords = reed_solomon_encode(field, &[32, 91, 11, 120, 209, 114, 220, 77], 10);
        assert_eq!(reed_solomon_decode(field, &mut codewords, 10), Ok(0));
    }

    #[test]
    fn test_correct_up_to_half_ec() {
        let field = gf256_qr();
        round_trip(field, &[1, 2, 3, 4, 5, 6, 7, 8], 10, &[(0, 99)]);
        round_trip(
            field,
            &[1, 2, 3, 4, 5, 6, 7, 8],
            10,
            &[(1, 0), (5, 255), (9, 77), (12, 3), (17, 200)],
        );
    }

    #[test]
    fn test_prime_field_correction() {
        round_trip(gf929(), &[10, 500, 928, 0, 37, 444], 8, &[(2, 1), (9, 900)]);
        round_trip(gf113(), &[5, 40, 112, 0, 9], 6, &[(0, 1), (7, 100)]);
    }

    #[test]
    fn test_small_field_correction() {
        round_trip(gf64(), &[12, 63, 0, 31], 6, &[(1, 0), (6, 13)]);
    }

    #[test]
    fn test_data_matrix_convention() {
        round_trip(gf256_data_matrix(), &[142, 164, 186], 5, &[(2, 0), (4, 7)]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any error pattern of weight <= floor(ec/2) corrects back
            /// to the original codeword.
            #[test]
            fn corrects_up_to_capacity(
                data in proptest::collection::vec(0u32..256, 4..24),
                ec in 4usize..16,
                seed in any::<u64>(),
            ) {
                let field = gf256_qr();
                let clean = reed_solomon_encode(field, &data, ec);
                let mut received = clean.clone();
                // Derive a deterministic error pattern from the seed.
                let capacity = ec / 2;
                let errors = (seed as usize % (capacity + 1)).min(clean.len());
                let mut positions = Vec::new();
                let mut s = seed;
                while positions.len() < errors {
                    s = s.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                    let pos = (s >> 16) as usize % clean.len();
                    if !positions.contains(&pos) {
                        positions.push(pos);
                    }
                }
                for &pos in &positions {
                    received[pos] ^= 1 + (seed as u32 % 255);
                }
                let corrected = reed_solomon_decode(field, &mut received, ec);
                prop_assert_eq!(received, clean);
                prop_assert_eq!(corrected.unwrap(), positions.len());
            }

            /// Beyond capacity the decoder reports an error or returns
            /// a different codeword; it never panics.
            #[test]
            fn over_capacity_never_lies_silently(
                data in proptest::collection::vec(0u32..256, 4..16),
                ec in 4usize..12,
            ) {
                let field = gf256_qr();
                let clean = reed_solomon_encode(field, &data, ec);
                let mut received = clean.clone();
                let weight = ec / 2 + 1;
                for i in 0..weight.min(received.len()) {
                    received[i] ^= 0x55;
                }
                match reed_solomon_decode(field, &mut received, ec) {
                    Ok(_) => prop_assert_ne!(received, clean),
                    Err(_) => {}
                }
            }
        }
    }

    #[test]
    fn test_too_many_errors_fails_cleanly() {
        let field = gf256_qr();
        let clean = reed_solomon_encode(field, &[1, 2, 3, 4, 5, 6, 7, 8], 6);
        let mut received = clean.clone();
        for (i, value) in [(0usize, 10u32), (2, 20), (4, 30), (6, 40)] {
            received[i] = value;
        }
        // Weight 4 > 3 = floor(6/2): either an error or a miscorrection,
        // never a crash or a silent pass-through of the original.
        match reed_solomon_decode(field, &mut received, 6) {
            Ok(_) => assert_ne!(received, clean),
            Err(_) => {}
        }
    }
}
