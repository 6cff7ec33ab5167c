use crate::into_optional::IntoOptional;

/// A value that is either present or absent.
///
/// Unlike `Option<T>`, the payload slot always exists. When absent it holds
/// `T::default()` and is never handed out as meaningful data.
///
/// As a serde field, mark it `#[serde(default)]` so that a missing key
/// decodes as absent. Without the attribute a missing key is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Optional<T> {
    pub(crate) value: T,
    pub(crate) present: bool,
}

impl<T: Default> Default for Optional<T> {
    fn default() -> Self {
        Self::none()
    }
}

impl<T> Optional<T> {
    pub fn none() -> Self
    where
        T: Default,
    {
        Self {
            value: T::default(),
            present: false,
        }
    }

    pub fn some(value: T) -> Self {
        Self {
            value,
            present: true,
        }
    }

    /// Copies the referenced value. The reference itself is never retained.
    pub fn from_ref(value: Option<&T>) -> Self
    where
        T: Clone + Default,
    {
        match value {
            Some(v) => Self::some(v.clone()),
            None => Self::none(),
        }
    }

    /// Returns a fresh heap copy of the payload, or `None` when absent.
    pub fn to_boxed(&self) -> Option<Box<T>>
    where
        T: Clone,
    {
        if self.present {
            Some(Box::new(self.value.clone()))
        } else {
            None
        }
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Returns the payload, or `T::default()` when absent. Use
    /// [`is_present`](Self::is_present) to tell the two apart.
    pub fn get(&self) -> T
    where
        T: Clone + Default,
    {
        if self.present {
            self.value.clone()
        } else {
            T::default()
        }
    }

    pub fn get_or(&self, fallback: T) -> T
    where
        T: Clone,
    {
        if self.present {
            self.value.clone()
        } else {
            fallback
        }
    }

    pub fn set(&mut self, value: impl IntoOptional<T>) {
        *self = value.into_optional();
    }

    pub fn as_option(&self) -> Option<&T> {
        self.present.then_some(&self.value)
    }

    pub fn as_mut(&mut self) -> Option<&mut T> {
        if self.present {
            Some(&mut self.value)
        } else {
            None
        }
    }

    pub fn into_option(self) -> Option<T> {
        self.present.then_some(self.value)
    }
}

impl<T: Default> From<Option<T>> for Optional<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::some(v),
            None => Self::none(),
        }
    }
}

impl<T> From<Optional<T>> for Option<T> {
    fn from(value: Optional<T>) -> Self {
        value.into_option()
    }
}
