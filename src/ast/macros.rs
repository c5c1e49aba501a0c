/// Declares an immutable AST node together with its builder and its draft.
///
/// Fields come in groups:
/// - `required`: must be given to the builder, `build()` fails otherwise;
/// - `text`: required `String` fields, exposed as `&str`;
/// - `defaulted`: start from `Default::default()`;
/// - `optional`: `Option<T>`, exposed as `Option<&T>`;
/// - `optional_text`: `Option<String>`, exposed as `Option<&str>`.
///
/// Every node gets a `location`, a `builder()` entry point and a
/// `transform(|draft| ..)` that snapshots the fields into a draft, lets the
/// caller edit it, and builds a fresh node. The original is never touched.
macro_rules! ast_node {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(required { $( $rf:ident : $rt:ty ),* $(,)? })?
            $(text { $( $tf:ident ),* $(,)? })?
            $(defaulted { $( $df:ident : $dt:ty ),* $(,)? })?
            $(optional { $( $of:ident : $ot:ty ),* $(,)? })?
            $(optional_text { $( $sf:ident ),* $(,)? })?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $name {
            location: $crate::ast::SourceLocation,
            $($( $rf: $rt, )*)?
            $($( $tf: String, )*)?
            $($( $df: $dt, )*)?
            $($( $of: Option<$ot>, )*)?
            $($( $sf: Option<String>, )*)?
        }

        camelpaste::paste! {
            /// Editable snapshot of a node, handed to its `transform`.
            #[derive(Clone, Debug, PartialEq)]
            pub struct [<$name Draft>] {
                pub location: $crate::ast::SourceLocation,
                $($( pub $rf: $rt, )*)?
                $($( pub $tf: String, )*)?
                $($( pub $df: $dt, )*)?
                $($( pub $of: Option<$ot>, )*)?
                $($( pub $sf: Option<String>, )*)?
            }

            /// Builder enforcing the node's mandatory fields.
            #[derive(Clone, Debug, Default)]
            pub struct [<$name Builder>] {
                location: $crate::ast::SourceLocation,
                $($( $rf: Option<$rt>, )*)?
                $($( $tf: Option<String>, )*)?
                $($( $df: $dt, )*)?
                $($( $of: Option<$ot>, )*)?
                $($( $sf: Option<String>, )*)?
            }

            impl [<$name Builder>] {
                pub fn location(mut self, location: $crate::ast::SourceLocation) -> Self {
                    self.location = location;
                    self
                }

                $($(
                    pub fn $rf(mut self, $rf: impl Into<$rt>) -> Self {
                        self.$rf = Some($rf.into());
                        self
                    }
                )*)?

                $($(
                    pub fn $tf(mut self, $tf: impl Into<String>) -> Self {
                        self.$tf = Some($tf.into());
                        self
                    }
                )*)?

                $($(
                    pub fn $df(mut self, $df: impl Into<$dt>) -> Self {
                        self.$df = $df.into();
                        self
                    }
                )*)?

                $($(
                    pub fn $of(mut self, $of: impl Into<Option<$ot>>) -> Self {
                        self.$of = $of.into();
                        self
                    }
                )*)?

                $($(
                    pub fn $sf<S: Into<String>>(mut self, $sf: Option<S>) -> Self {
                        self.$sf = $sf.map(Into::into);
                        self
                    }
                )*)?

                pub fn build(self) -> $crate::error::Result<$name> {
                    Ok($name {
                        location: self.location,
                        $($(
                            $rf: self.$rf.ok_or($crate::error::Error::MissingField {
                                node: stringify!($name),
                                field: stringify!($rf),
                            })?,
                        )*)?
                        $($(
                            $tf: self.$tf.ok_or($crate::error::Error::MissingField {
                                node: stringify!($name),
                                field: stringify!($tf),
                            })?,
                        )*)?
                        $($( $df: self.$df, )*)?
                        $($( $of: self.$of, )*)?
                        $($( $sf: self.$sf, )*)?
                    })
                }
            }

            impl $name {
                pub fn builder() -> [<$name Builder>] {
                    Default::default()
                }

                pub fn location(&self) -> &$crate::ast::SourceLocation {
                    &self.location
                }

                $($(
                    pub fn $rf(&self) -> &$rt {
                        &self.$rf
                    }
                )*)?

                $($(
                    pub fn $tf(&self) -> &str {
                        &self.$tf
                    }
                )*)?

                $($(
                    pub fn $df(&self) -> &$dt {
                        &self.$df
                    }
                )*)?

                $($(
                    pub fn $of(&self) -> Option<&$ot> {
                        self.$of.as_ref()
                    }
                )*)?

                $($(
                    pub fn $sf(&self) -> Option<&str> {
                        self.$sf.as_deref()
                    }
                )*)?

                pub fn transform(&self, mutate: impl FnOnce(&mut [<$name Draft>])) -> Self {
                    let mut draft = [<$name Draft>] {
                        location: self.location.clone(),
                        $($( $rf: self.$rf.clone(), )*)?
                        $($( $tf: self.$tf.clone(), )*)?
                        $($( $df: self.$df.clone(), )*)?
                        $($( $of: self.$of.clone(), )*)?
                        $($( $sf: self.$sf.clone(), )*)?
                    };
                    mutate(&mut draft);
                    Self {
                        location: draft.location,
                        $($( $rf: draft.$rf, )*)?
                        $($( $tf: draft.$tf, )*)?
                        $($( $df: draft.$df, )*)?
                        $($( $of: draft.$of, )*)?
                        $($( $sf: draft.$sf, )*)?
                    }
                }
            }
        }
    };
}

/// Nodes that structurally hold no children: empty named children, and any
/// non-empty replacement is refused.
macro_rules! leaf_node {
    ($($name:ident),* $(,)?) => {
        $(
            impl $crate::ast::AstNode for $name {
                fn named_children(&self) -> $crate::ast::NamedChildren {
                    $crate::ast::NamedChildren::new()
                }

                fn with_new_children(
                    &self,
                    children: $crate::ast::NamedChildren,
                ) -> $crate::error::Result<Self> {
                    if children.values().any(|list| !list.is_empty()) {
                        return Err($crate::error::Error::UnexpectedChildren {
                            node: stringify!($name),
                        });
                    }
                    Ok(self.clone())
                }
            }
        )*
    };
}
