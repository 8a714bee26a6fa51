macro_rules! identifier {
    ($name: ident) => {
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            Ord,
            PartialEq,
            Eq,
            Hash,
            derive_more::Display,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(usize);

        impl $name {
            pub const ZERO: $name = Self::new(0);
            pub const ONE: $name = Self::new(1);

            pub const fn new(value: usize) -> Self {
                Self(value)
            }

            pub const fn into_usize(self) -> usize {
                self.0
            }
        }
    };
}

macro_rules! name {
    ($name: ident) => {
        #[derive(
            Debug,
            Default,
            Clone,
            PartialOrd,
            Ord,
            PartialEq,
            Eq,
            Hash,
            derive_more::Display,
            derive_more::From,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(val: &str) -> Self {
                Self(val.to_owned())
            }
        }
    };
}

identifier!(EndpointId);
identifier!(ElementId);

name!(VlinkName);
name!(MuxName);
