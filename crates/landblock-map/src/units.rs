macro_rules! def_units {
    ($t: ident, $doc: literal) => {
        #[doc = $doc]
        #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
        pub struct $t<T>(pub T);

        impl<T> $t<T> {
            pub fn into_inner(self) -> T {
                self.0
            }
        }
    };
}

def_units!(WorldUnits, "Denotes that the inner `T` is given in world units. One terrain cell spans 24 world units.");
def_units!(VertexUnits, "Denotes that the inner `T` is given in units of global vertex coordinates.");
