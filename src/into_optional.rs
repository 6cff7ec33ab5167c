use crate::optional::Optional;

pub trait IntoOptional<T> {
    fn into_optional(self) -> Optional<T>;
}

impl<T> IntoOptional<T> for T {
    fn into_optional(self) -> Optional<T> {
        Optional::some(self)
    }
}

impl<T: Default> IntoOptional<T> for Option<T> {
    fn into_optional(self) -> Optional<T> {
        self.into()
    }
}

impl<T> IntoOptional<T> for Optional<T> {
    fn into_optional(self) -> Optional<T> {
        self
    }
}
