macro_rules! impl_breakpoint_address {
    ($name:ident, $index:literal) => {
        #[doc = concat!("`DR", stringify!($index), "` debug register.")]
        ///
        #[doc = concat!(
            "Contains the linear address of breakpoint ",
            stringify!($index),
            "."
        )]
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
        pub struct $name(pub u64);

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

impl_breakpoint_address!(Dr0, 0);
impl_breakpoint_address!(Dr1, 1);
impl_breakpoint_address!(Dr2, 2);
impl_breakpoint_address!(Dr3, 3);
