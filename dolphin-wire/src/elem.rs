// Fixed-width element encodings. Every fixed-width storage class is written
// as its little-endian bytes; a reversed stream swaps each element.

use dolphin_vals::vector::SymbolId;
use dolphin_vals::Fixed16;

pub trait FixedElem: Sized {
    const WIDTH: usize;
    fn put(&self, out: &mut [u8], reversed: bool);
    fn get(buf: &[u8], reversed: bool) -> Self;
}

macro_rules! fixed_elem {
    ($($t:ty),*) => {
        $(impl FixedElem for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();

            fn put(&self, out: &mut [u8], reversed: bool) {
                let b = if reversed { self.to_be_bytes() } else { self.to_le_bytes() };
                out[..Self::WIDTH].copy_from_slice(&b);
            }

            fn get(buf: &[u8], reversed: bool) -> Self {
                let mut b = [0u8; std::mem::size_of::<$t>()];
                b.copy_from_slice(&buf[..Self::WIDTH]);
                if reversed {
                    <$t>::from_be_bytes(b)
                } else {
                    <$t>::from_le_bytes(b)
                }
            }
        })*
    };
}

fixed_elem!(i8, i16, i32, i64, i128, f32, f64);

impl FixedElem for Fixed16 {
    const WIDTH: usize = 16;

    fn put(&self, out: &mut [u8], reversed: bool) {
        out[..16].copy_from_slice(self);
        if reversed {
            out[..16].reverse();
        }
    }

    fn get(buf: &[u8], reversed: bool) -> Self {
        let mut b = [0u8; 16];
        b.copy_from_slice(&buf[..16]);
        if reversed {
            b.reverse();
        }
        b
    }
}

impl FixedElem for SymbolId {
    const WIDTH: usize = 4;

    fn put(&self, out: &mut [u8], reversed: bool) {
        self.0.put(out, reversed)
    }

    fn get(buf: &[u8], reversed: bool) -> Self {
        SymbolId(i32::get(buf, reversed))
    }
}
