//! Galois field arithmetic
//!
//! One [`GaloisField`] value covers both field families used by the
//! symbologies: prime fields GF(p) with modular arithmetic, and binary
//! extension fields GF(2ⁿ) with polynomial arithmetic modulo a primitive
//! polynomial. Every instance precomputes `exp`/`log` tables indexed by
//! field value, so multiply/divide are two lookups.
//!
//! The named instances are process-wide and built once on first use; the
//! tables are a few KB each and must not be recomputed per decode call.

use std::sync::OnceLock;

/// A finite field with precomputed discrete-log tables.
pub struct GaloisField {
    size: u32,
    prime: bool,
    /// First consecutive root of the generator polynomial: syndromes are
    /// evaluated at α^b .. α^(b+k-1). QR uses 0, everything else 1.
    generator_base: u32,
    exp: Vec<u16>,
    log: Vec<u16>,
}

impl GaloisField {
    /// Prime field GF(p) with the given multiplicative generator.
    pub fn new_prime(p: u32, generator: u32, generator_base: u32) -> Self {
        let mut exp = vec![0u16; p as usize];
        let mut log = vec![0u16; p as usize];
        let mut x = 1u32;
        for i in 0..p - 1 {
            exp[i as usize] = x as u16;
            log[x as usize] = i as u16;
            x = (x * generator) % p;
        }
        Self {
            size: p,
            prime: true,
            generator_base,
            exp,
            log,
        }
    }

    /// Binary extension field GF(2ⁿ) of the given size, reduced by
    /// `primitive` (the full polynomial including the x^n term).
    pub fn new_binary(size: u32, primitive: u32, generator_base: u32) -> Self {
        let mut exp = vec![0u16; size as usize];
        let mut log = vec![0u16; size as usize];
        let mut x = 1u32;
        for i in 0..size - 1 {
            exp[i as usize] = x as u16;
            log[x as usize] = i as u16;
            x <<= 1;
            if x >= size {
                x = (x ^ primitive) & (size - 1);
            }
        }
        Self {
            size,
            prime: false,
            generator_base,
            exp,
            log,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn generator_base(&self) -> u32 {
        self.generator_base
    }

    #[inline]
    pub fn add(&self, a: u32, b: u32) -> u32 {
        if self.prime {
            (a + b) % self.size
        } else {
            a ^ b
        }
    }

    #[inline]
    pub fn sub(&self, a: u32, b: u32) -> u32 {
        if self.prime {
            (a + self.size - b) % self.size
        } else {
            a ^ b
        }
    }

    #[inline]
    pub fn neg(&self, a: u32) -> u32 {
        self.sub(0, a)
    }

    #[inline]
    pub fn mul(&self, a: u32, b: u32) -> u32 {
        if a == 0 || b == 0 {
            return 0;
        }
        let order = self.size - 1;
        let i = (u32::from(self.log[a as usize]) + u32::from(self.log[b as usize])) % order;
        u32::from(self.exp[i as usize])
    }

    /// α^i (i may exceed the multiplicative order).
    #[inline]
    pub fn exp(&self, i: u32) -> u32 {
        u32::from(self.exp[(i % (self.size - 1)) as usize])
    }

    /// Discrete log of a non-zero element.
    #[inline]
    pub fn log(&self, a: u32) -> u32 {
        debug_assert!(a != 0);
        u32::from(self.log[a as usize])
    }

    /// Multiplicative inverse of a non-zero element.
    #[inline]
    pub fn inv(&self, a: u32) -> u32 {
        debug_assert!(a != 0);
        let order = self.size - 1;
        u32::from(self.exp[((order - u32::from(self.log[a as usize])) % order) as usize])
    }
}

// ============================================================================
// Named instances
// ============================================================================

macro_rules! field_instance {
    ($(#[$doc:meta])* $name:ident, $build:expr) => {
        $(#[$doc])*
        pub fn $name() -> &'static GaloisField {
            static FIELD: OnceLock<GaloisField> = OnceLock::new();
            FIELD.get_or_init(|| $build)
        }
    };
}

field_instance!(
    /// GF(929), generator 3: PDF417 and Grid Matrix.
    gf929,
    GaloisField::new_prime(929, 3, 1)
);

field_instance!(
    /// GF(113), generator 3: DotCode.
    gf113,
    GaloisField::new_prime(113, 3, 1)
);

field_instance!(
    /// GF(256) over x⁸+x⁴+x³+x²+1: the QR code family.
    gf256_qr,
    GaloisField::new_binary(256, 0x11D, 0)
);

field_instance!(
    /// GF(256) over x⁸+x⁵+x³+x²+1: Data Matrix ECC 200, Aztec 8-bit
    /// data words, Code One and Han Xin.
    gf256_data_matrix,
    GaloisField::new_binary(256, 0x12D, 1)
);

field_instance!(
    /// GF(64) over x⁶+x+1: Mailmark, MaxiCode and Aztec 6-bit words.
    gf64,
    GaloisField::new_binary(64, 0x43, 1)
);

field_instance!(
    /// GF(16) over x⁴+x+1: the Aztec mode message.
    gf16,
    GaloisField::new_binary(16, 0x13, 1)
);

field_instance!(
    /// GF(128) over x⁷+x³+1.
    gf128,
    GaloisField::new_binary(128, 0x89, 1)
);

field_instance!(
    /// GF(1024) over x¹⁰+x³+1: Aztec 10-bit data words.
    gf1024,
    GaloisField::new_binary(1024, 0x409, 1)
);

field_instance!(
    /// GF(4096) over x¹²+x⁶+x⁵+x³+1: Aztec 12-bit data words.
    gf4096,
    GaloisField::new_binary(4096, 0x1069, 1)
);

// ============================================================================
// Polynomials
// ============================================================================

/// A polynomial over a [`GaloisField`], coefficients highest-degree first.
/// Temporaries inside Reed-Solomon decoding.
#[derive(Clone)]
pub struct GfPoly<'a> {
    field: &'a GaloisField,
    /// Normalised: no leading zero unless the polynomial is zero itself.
    coefficients: Vec<u32>,
}

impl<'a> GfPoly<'a> {
    pub fn new(field: &'a GaloisField, coefficients: Vec<u32>) -> Self {
        let first_non_zero = coefficients.iter().position(|&c| c != 0);
        let coefficients = match first_non_zero {
            Some(0) => coefficients,
            Some(i) => coefficients[i..].to_vec(),
            None => vec![0],
        };
        Self {
            field,
            coefficients,
        }
    }

    pub fn zero(field: &'a GaloisField) -> Self {
        Self {
            field,
            coefficients: vec![0],
        }
    }

    pub fn one(field: &'a GaloisField) -> Self {
        Self {
            field,
            coefficients: vec![1],
        }
    }

    /// coefficient * x^degree
    pub fn monomial(field: &'a GaloisField, degree: usize, coefficient: u32) -> Self {
        if coefficient == 0 {
            return Self::zero(field);
        }
        let mut coefficients = vec![0; degree + 1];
        coefficients[0] = coefficient;
        Self {
            field,
            coefficients,
        }
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    pub fn is_zero(&self) -> bool {
        self.coefficients[0] == 0
    }

    /// Coefficient of x^degree.
    pub fn coefficient(&self, degree: usize) -> u32 {
        if degree > self.degree() {
            0
        } else {
            self.coefficients[self.coefficients.len() - 1 - degree]
        }
    }

    pub fn evaluate_at(&self, x: u32) -> u32 {
        if x == 0 {
            return self.coefficient(0);
        }
        let f = self.field;
        let mut result = 0;
        for &c in &self.coefficients {
            result = f.add(f.mul(result, x), c);
        }
        result
    }

    pub fn add(&self, other: &GfPoly<'a>) -> GfPoly<'a> {
        if self.is_zero() {
            return other.clone();
        }
        if other.is_zero() {
            return self.clone();
        }
        let (small, large) = if self.coefficients.len() <= other.coefficients.len() {
            (&self.coefficients, &other.coefficients)
        } else {
            (&other.coefficients, &self.coefficients)
        };
        let offset = large.len() - small.len();
        let mut sum = large[..offset].to_vec();
        for i in 0..small.len() {
            sum.push(self.field.add(small[i], large[offset + i]));
        }
        GfPoly::new(self.field, sum)
    }

    pub fn subtract(&self, other: &GfPoly<'a>) -> GfPoly<'a> {
        self.add(&other.negative())
    }

    pub fn negative(&self) -> GfPoly<'a> {
        let coefficients = self.coefficients.iter().map(|&c| self.field.neg(c)).collect();
        GfPoly {
            field: self.field,
            coefficients,
        }
    }

    pub fn multiply(&self, other: &GfPoly<'a>) -> GfPoly<'a> {
        if self.is_zero() || other.is_zero() {
            return GfPoly::zero(self.field);
        }
        let f = self.field;
        let a = &self.coefficients;
        let b = &other.coefficients;
        let mut product = vec![0u32; a.len() + b.len() - 1];
        for (i, &ac) in a.iter().enumerate() {
            for (j, &bc) in b.iter().enumerate() {
                product[i + j] = f.add(product[i + j], f.mul(ac, bc));
            }
        }
        GfPoly::new(f, product)
    }

    pub fn multiply_scalar(&self, scalar: u32) -> GfPoly<'a> {
        if scalar == 0 {
            return GfPoly::zero(self.field);
        }
        let coefficients = self
            .coefficients
            .iter()
            .map(|&c| self.field.mul(c, scalar))
            .collect();
        GfPoly::new(self.field, coefficients)
    }

    pub fn multiply_by_monomial(&self, degree: usize, coefficient: u32) -> GfPoly<'a> {
        if coefficient == 0 {
            return GfPoly::zero(self.field);
        }
        let mut coefficients: Vec<u32> = self
            .coefficients
            .iter()
            .map(|&c| self.field.mul(c, coefficient))
            .collect();
        coefficients.extend(std::iter::repeat(0).take(degree));
        GfPoly::new(self.field, coefficients)
    }
}
