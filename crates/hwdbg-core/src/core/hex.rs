macro_rules! impl_base {
    ($type:ty) => {
        impl ::std::fmt::Debug for Hex<$type> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                impl_base_fmt(f, self.0)
            }
        }

        impl ::std::fmt::Display for Hex<$type> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                impl_base_fmt(f, self.0)
            }
        }
    };
}

fn impl_base_fmt<T>(f: &mut ::std::fmt::Formatter, data: T) -> ::std::fmt::Result
where
    T: Copy + ::std::fmt::LowerHex,
{
    match size_of::<T>() {
        1 => write!(f, "0x{:02x}", data),
        2 => write!(f, "0x{:04x}", data),
        4 => write!(f, "0x{:08x}", data),
        8 => write!(f, "0x{:016x}", data),
        _ => write!(f, "0x{:x}", data),
    }
}

macro_rules! impl_sequence {
    ($type:ty) => {
        impl ::std::fmt::Debug for Hex<$type> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                impl_base_sequence(f, self.0)
            }
        }

        impl ::std::fmt::Display for Hex<$type> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                impl_base_sequence(f, self.0)
            }
        }
    };
}

fn impl_base_sequence<T>(f: &mut ::std::fmt::Formatter, data: &[T]) -> ::std::fmt::Result
where
    T: Copy + ::std::fmt::LowerHex,
{
    write!(f, "[")?;

    for (index, item) in data.iter().enumerate() {
        if index > 0 {
            write!(f, " ")?;
        }

        write!(f, "{:02x}", item)?;
    }

    write!(f, "]")
}

/// A hexadecimal representation of a value.
///
/// Used to print register contents and instruction bytes in diagnostics.
///
/// # Examples
///
/// ```
/// # use hwdbg_core::Hex;
/// assert_eq!(format!("{}", Hex(42u16)), "0x002a");
/// assert_eq!(Hex(&[0x0fu8, 0x01, 0xf9][..]).to_string(), "[0f 01 f9]");
/// ```
pub struct Hex<T>(pub T);

impl_base!(u8);
impl_base!(u16);
impl_base!(u32);
impl_base!(u64);
impl_base!(usize);

impl_sequence!(&[u8]);
