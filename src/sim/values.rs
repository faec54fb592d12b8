//! Signal values for simulation: 64-lane packed words, ternary values and test vectors

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not};
use std::str::FromStr;

use rand::Rng;

/// Number of lanes in a packed value
pub const NB_LANES: usize = 64;

/// 64 boolean values packed in a word, one per simulation lane
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PackedVal(pub u64);

impl PackedVal {
    /// All lanes at 0
    pub const ALL0: PackedVal = PackedVal(0);
    /// All lanes at 1
    pub const ALL1: PackedVal = PackedVal(!0);

    /// Only lane i set
    pub fn bit(i: usize) -> PackedVal {
        assert!(i < NB_LANES);
        PackedVal(1 << i)
    }

    /// Lanes 0 to nb-1 set
    pub fn mask(nb: usize) -> PackedVal {
        assert!(nb <= NB_LANES);
        if nb == NB_LANES {
            PackedVal::ALL1
        } else {
            PackedVal((1 << nb) - 1)
        }
    }

    /// Same value on all lanes
    pub fn from_bool(b: bool) -> PackedVal {
        if b {
            PackedVal::ALL1
        } else {
            PackedVal::ALL0
        }
    }

    /// Value of lane i
    pub fn lane(&self, i: usize) -> bool {
        (self.0 >> i) & 1 != 0
    }

    /// Returns whether no lane is set
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Index of the lowest lane set, if any
    pub fn lowest_lane(&self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }
}

impl Not for PackedVal {
    type Output = PackedVal;
    fn not(self) -> PackedVal {
        PackedVal(!self.0)
    }
}

impl BitAnd for PackedVal {
    type Output = PackedVal;
    fn bitand(self, rhs: PackedVal) -> PackedVal {
        PackedVal(self.0 & rhs.0)
    }
}

impl BitOr for PackedVal {
    type Output = PackedVal;
    fn bitor(self, rhs: PackedVal) -> PackedVal {
        PackedVal(self.0 | rhs.0)
    }
}

impl BitXor for PackedVal {
    type Output = PackedVal;
    fn bitxor(self, rhs: PackedVal) -> PackedVal {
        PackedVal(self.0 ^ rhs.0)
    }
}

impl BitAndAssign for PackedVal {
    fn bitand_assign(&mut self, rhs: PackedVal) {
        self.0 &= rhs.0;
    }
}

impl BitOrAssign for PackedVal {
    fn bitor_assign(&mut self, rhs: PackedVal) {
        self.0 |= rhs.0;
    }
}

impl BitXorAssign for PackedVal {
    fn bitxor_assign(&mut self, rhs: PackedVal) {
        self.0 ^= rhs.0;
    }
}

/// Ternary logic value
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Val3 {
    /// Logic 0
    Zero,
    /// Logic 1
    One,
    /// Unknown
    #[default]
    X,
}

impl Val3 {
    /// Returns whether the value is 0 or 1
    pub fn is_known(self) -> bool {
        self != Val3::X
    }

    /// Boolean value, if known
    pub fn to_bool(self) -> Option<bool> {
        match self {
            Val3::Zero => Some(false),
            Val3::One => Some(true),
            Val3::X => None,
        }
    }

    /// Conjunction of the values: 0 if any is 0, else X if any is X
    pub fn and(vals: impl IntoIterator<Item = Val3>) -> Val3 {
        let mut ret = Val3::One;
        for v in vals {
            match v {
                Val3::Zero => return Val3::Zero,
                Val3::X => ret = Val3::X,
                Val3::One => (),
            }
        }
        ret
    }

    /// Disjunction of the values: 1 if any is 1, else X if any is X
    pub fn or(vals: impl IntoIterator<Item = Val3>) -> Val3 {
        !Val3::and(vals.into_iter().map(|v| !v))
    }

    /// Exclusive-or of the values: X if any is X
    pub fn xor(vals: impl IntoIterator<Item = Val3>) -> Val3 {
        let mut ret = false;
        for v in vals {
            match v.to_bool() {
                None => return Val3::X,
                Some(b) => ret ^= b,
            }
        }
        Val3::from(ret)
    }
}

impl From<bool> for Val3 {
    fn from(b: bool) -> Val3 {
        if b {
            Val3::One
        } else {
            Val3::Zero
        }
    }
}

impl Not for Val3 {
    type Output = Val3;
    fn not(self) -> Val3 {
        match self {
            Val3::Zero => Val3::One,
            Val3::One => Val3::Zero,
            Val3::X => Val3::X,
        }
    }
}

impl fmt::Display for Val3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Val3::Zero => '0',
            Val3::One => '1',
            Val3::X => 'X',
        };
        write!(f, "{c}")
    }
}

/// Assignment of the primary inputs, where some values may be unknown
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TestVector {
    vals: Vec<Val3>,
}

impl TestVector {
    /// Create a vector for nb inputs, all unknown
    pub fn new(nb: usize) -> TestVector {
        TestVector {
            vals: vec![Val3::X; nb],
        }
    }

    /// Create a fully specified vector
    pub fn from_bools(vals: &[bool]) -> TestVector {
        TestVector {
            vals: vals.iter().map(|b| Val3::from(*b)).collect(),
        }
    }

    /// Number of inputs
    pub fn len(&self) -> usize {
        self.vals.len()
    }

    /// Returns whether the vector has no input
    pub fn is_empty(&self) -> bool {
        self.vals.is_empty()
    }

    /// Reset all values to unknown
    pub fn init(&mut self) {
        self.vals.fill(Val3::X);
    }

    /// Value of input i
    pub fn val3(&self, i: usize) -> Val3 {
        self.vals[i]
    }

    /// Set the value of input i
    pub fn set_val(&mut self, i: usize, v: Val3) {
        self.vals[i] = v;
    }

    /// All values
    pub fn values(&self) -> &[Val3] {
        &self.vals
    }

    /// Number of unknown values
    pub fn nb_x(&self) -> usize {
        self.vals.iter().filter(|v| !v.is_known()).count()
    }

    /// Replace unknown values by random ones
    pub fn fill_x_random<R: Rng>(&mut self, rng: &mut R) {
        for v in &mut self.vals {
            if !v.is_known() {
                *v = Val3::from(rng.gen::<bool>());
            }
        }
    }

    /// Boolean values, with unknown values at 0
    pub fn to_bools(&self) -> Vec<bool> {
        self.vals.iter().map(|v| *v == Val3::One).collect()
    }
}

impl fmt::Display for TestVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for v in &self.vals {
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl FromStr for TestVector {
    type Err = String;

    fn from_str(s: &str) -> Result<TestVector, String> {
        let vals = s
            .trim()
            .chars()
            .map(|c| match c {
                '0' => Ok(Val3::Zero),
                '1' => Ok(Val3::One),
                'X' | 'x' | '-' => Ok(Val3::X),
                _ => Err(format!("Invalid value {c} in test vector")),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TestVector { vals })
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_packed() {
        let a = PackedVal(0b1100);
        let b = PackedVal(0b1010);
        assert_eq!(a & b, PackedVal(0b1000));
        assert_eq!(a | b, PackedVal(0b1110));
        assert_eq!(a ^ b, PackedVal(0b0110));
        assert_eq!(!PackedVal::ALL0, PackedVal::ALL1);
        assert_eq!((a ^ b).lowest_lane(), Some(1));
        assert_eq!(PackedVal::ALL0.lowest_lane(), None);
        assert!(a.lane(3));
        assert!(!a.lane(1));
        assert_eq!(PackedVal::mask(3), PackedVal(0b111));
        assert_eq!(PackedVal::mask(64), PackedVal::ALL1);
    }

    #[test]
    fn test_val3() {
        use Val3::*;
        assert_eq!(Val3::and([One, X]), X);
        assert_eq!(Val3::and([Zero, X]), Zero);
        assert_eq!(Val3::and([One, One]), One);
        assert_eq!(Val3::or([One, X]), One);
        assert_eq!(Val3::or([Zero, X]), X);
        assert_eq!(Val3::or([Zero, Zero]), Zero);
        assert_eq!(Val3::xor([One, One, One]), One);
        assert_eq!(Val3::xor([One, X]), X);
        assert_eq!(!X, X);
        assert_eq!(!Zero, One);
    }

    #[test]
    fn test_vector() {
        let mut tv: TestVector = "01X1".parse().unwrap();
        assert_eq!(tv.len(), 4);
        assert_eq!(tv.val3(2), Val3::X);
        assert_eq!(tv.nb_x(), 1);
        assert_eq!(format!("{tv}"), "01X1");
        assert_eq!(tv.to_bools(), vec![false, true, false, true]);

        let mut rng = SmallRng::seed_from_u64(1);
        tv.fill_x_random(&mut rng);
        assert_eq!(tv.nb_x(), 0);
        assert_eq!(tv.val3(1), Val3::One);

        tv.init();
        assert_eq!(tv, TestVector::new(4));
        assert!("01a".parse::<TestVector>().is_err());
    }
}
