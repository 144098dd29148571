//! This module contains the definition of the [`DataLayout`] struct, as well
//! as the queries over it that the lowering passes use to compute field
//! offsets and in-memory sizes.
//!
//! Only the portions of the layout string that affect how element state
//! structs are laid out in memory are modelled. The remaining segment kinds
//! are parsed and discarded so that real-world layout strings still parse.

use chumsky::{
    error::Simple,
    prelude::{choice, just},
    Parser,
};
use clift_errors::load::{Error, Result};

use crate::types::{LlvmType, LlvmTypeId, TypeTable};

/// The number of bits in a byte.
const BYTE_SIZE: u64 = 8;

/// The default layout of pointers in address space zero, as `(address space,
/// size, abi alignment, preferred alignment, index size)` in bits.
const DEFAULT_POINTER_0_LAYOUT: (u64, u64, u64, u64, u64) = (0, 64, 64, 64, 64);

/// The default integer layouts, as `(size, abi alignment, preferred
/// alignment)` in bits.
const DEFAULT_INTEGER_LAYOUTS: [(u64, u64, u64); 5] = [
    (1, 8, 8),
    (8, 8, 8),
    (16, 16, 16),
    (32, 32, 32),
    (64, 32, 64),
];

/// The default floating-point layouts, as `(size, abi alignment, preferred
/// alignment)` in bits.
const DEFAULT_FLOAT_LAYOUTS: [(u64, u64, u64); 4] = [
    (16, 16, 16),
    (32, 32, 32),
    (64, 64, 64),
    (128, 128, 128),
];

/// Information about the expected data-layout for this module.
///
/// # Defaulting
///
/// LLVM starts with a default specification of the data-layout that is
/// possibly overridden by the data-layout string. This struct implements this
/// behavior, so if you want a defaulted layout, either call
/// [`DataLayout::new`] with an empty string, or use the [`Default`] instance.
#[derive(Clone, Debug, PartialEq)]
pub struct DataLayout {
    /// The endianness used in this data layout.
    pub endianness: Endianness,

    /// The mangling scheme used by this data layout.
    pub mangling: Mangling,

    /// The natural alignment of the stack in bits.
    pub stack_alignment: u64,

    /// The layout of pointers, per address space.
    pub pointer_layouts: Vec<PointerLayout>,

    /// The layout of the various integer types.
    pub integer_layouts: Vec<IntegerLayout>,

    /// The layout of the various floating-point types.
    pub float_layouts: Vec<FloatLayout>,

    /// The layout of aggregate types.
    pub aggregate_layout: AggregateLayout,
}

impl DataLayout {
    /// Constructs a new data layout description from the provided
    /// `layout_string`.
    ///
    /// If any portion of the data layout specification is left unspecified,
    /// then the default data layout specification is used in its place as
    /// described [here](https://llvm.org/docs/LangRef.html#data-layout). The
    /// segment kinds that have no bearing on how state structs are laid out,
    /// such as vector layouts and native integer widths, are accepted and
    /// discarded.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDataLayoutSpecification`] if the provided
    ///   `layout_string` cannot be parsed as a data layout specification.
    pub fn new(layout_string: &str) -> Result<Self> {
        let parts = layout_string.split('-');

        // Allocate a default that is KNOWINGLY INCOMPLETE. This is not a valid layout
        // to return, but serves as a place to stick our specifications as we parse
        // them.
        let mut layout = DataLayout {
            endianness:       Endianness::Little,
            mangling:         Mangling::ELF,
            stack_alignment:  0,
            pointer_layouts:  vec![],
            integer_layouts:  vec![],
            float_layouts:    vec![],
            aggregate_layout: AggregateLayout {
                abi_alignment:       0,
                preferred_alignment: 64,
            },
        };

        // Parse out each specification from the data-layout string.
        for part in parts {
            if let Ok(e) = Endianness::parser().parse(part) {
                layout.endianness = e;
            } else if let Ok(m) = Mangling::parser().parse(part) {
                layout.mangling = m;
            } else if let Ok(align) = parsing::stack_alignment().parse(part) {
                layout.stack_alignment = align;
            } else if let Ok(ptr_spec) = PointerLayout::parser().parse(part) {
                layout.pointer_layouts.push(ptr_spec);
            } else if let Ok(int_spec) = IntegerLayout::parser().parse(part) {
                layout.integer_layouts.push(int_spec);
            } else if let Ok(float_spec) = FloatLayout::parser().parse(part) {
                layout.float_layouts.push(float_spec);
            } else if let Ok(agg) = AggregateLayout::parser().parse(part) {
                layout.aggregate_layout = agg;
            } else if parsing::ignored_segment().parse(part).is_ok() {
                // Vector layouts, function pointer layouts, native integer
                // widths and address space specifications do not affect state
                // struct layout.
                continue;
            } else if part.is_empty() {
                // We don't know if empty parts are allowed, so we just behave permissively
                // here. It cannot introduce any bugs to be permissive in this case.
                continue;
            } else {
                Err(Error::InvalidDataLayoutSpecification(
                    layout_string.to_string(),
                    part.to_string(),
                ))?;
            }
        }

        // Finally we add the defaults for vector-typed fields as these have to be done
        // after parsing.
        layout.pointer_layouts = Self::pointer_specs_or_defaults(layout.pointer_layouts);
        layout.integer_layouts = Self::int_specs_or_defaults(layout.integer_layouts);
        layout.float_layouts = Self::float_specs_or_defaults(layout.float_layouts);

        Ok(layout)
    }

    /// Augments the parsed floating-point layout specifications with any
    /// missing information based on the defaults for LLVM's data layout.
    fn float_specs_or_defaults(mut specs: Vec<FloatLayout>) -> Vec<FloatLayout> {
        for (size, abi_alignment, preferred_alignment) in DEFAULT_FLOAT_LAYOUTS {
            if !specs.iter().any(|f| f.size == size) {
                specs.push(FloatLayout {
                    size,
                    abi_alignment,
                    preferred_alignment,
                });
            }
        }

        specs.sort();
        specs
    }

    /// Augments the parsed integer specifications with any missing information
    /// based on the defaults for LLVM's data layout.
    fn int_specs_or_defaults(mut specs: Vec<IntegerLayout>) -> Vec<IntegerLayout> {
        for (size, abi_alignment, preferred_alignment) in DEFAULT_INTEGER_LAYOUTS {
            if !specs.iter().any(|i| i.size == size) {
                specs.push(IntegerLayout {
                    size,
                    abi_alignment,
                    preferred_alignment,
                });
            }
        }

        specs.sort();
        specs
    }

    /// Augments the parsed pointer specifications with any missing information
    /// based on the defaults for LLVM's data layout.
    fn pointer_specs_or_defaults(mut specs: Vec<PointerLayout>) -> Vec<PointerLayout> {
        let (space, size, abi, pref, index) = DEFAULT_POINTER_0_LAYOUT;
        if !specs.iter().any(|l| l.address_space == space) {
            specs.push(PointerLayout {
                address_space: space,
                size,
                abi_alignment: abi,
                preferred_alignment: pref,
                index_size: index,
            });
        }

        specs.sort();
        specs
    }

    /// Gets the layout of pointers in address space zero, which is the only
    /// address space the modules we process allocate in.
    ///
    /// # Panics
    ///
    /// - If no layout is known for address space zero, which cannot happen
    ///   for a layout built by [`Self::new`].
    #[must_use]
    pub fn pointer_layout(&self) -> &PointerLayout {
        self.pointer_layouts
            .iter()
            .find(|layout| layout.address_space == 0)
            .expect("internal consistency error: no pointer layout for address space zero")
    }

    /// Computes the ABI alignment of the type referenced by `id` in bytes.
    ///
    /// # Panics
    ///
    /// - If `id` refers to a type with no in-memory layout, namely void and
    ///   opaque structs.
    #[must_use]
    pub fn abi_alignment(&self, types: &TypeTable, id: LlvmTypeId) -> u64 {
        match types.get(id) {
            LlvmType::Int { bits } => self.int_alignment(u64::from(*bits)),
            LlvmType::Float { bits } => self.float_alignment(u64::from(*bits)),
            LlvmType::Pointer { .. } => self.pointer_layout().abi_alignment.div_ceil(BYTE_SIZE),
            LlvmType::Array { element, .. } => self.abi_alignment(types, *element),
            LlvmType::Struct { fields, packed, .. } => {
                if *packed {
                    1
                } else {
                    self.struct_layout(types, fields, *packed).alignment
                }
            }
            LlvmType::Void | LlvmType::Opaque { .. } => panic!(
                "internal consistency error: alignment queried for {} which has no layout",
                types.display(id)
            ),
        }
    }

    /// Computes the number of bytes needed to hold a value of the type
    /// referenced by `id`.
    ///
    /// # Panics
    ///
    /// - If `id` refers to a type with no in-memory layout, namely void and
    ///   opaque structs.
    #[must_use]
    pub fn store_size(&self, types: &TypeTable, id: LlvmTypeId) -> u64 {
        match types.get(id) {
            LlvmType::Int { bits } | LlvmType::Float { bits } => {
                u64::from(*bits).div_ceil(BYTE_SIZE)
            }
            LlvmType::Pointer { .. } => self.pointer_layout().size.div_ceil(BYTE_SIZE),
            LlvmType::Array { element, count } => self.alloc_size(types, *element) * count,
            LlvmType::Struct { fields, packed, .. } => {
                self.struct_layout(types, fields, *packed).size
            }
            LlvmType::Void | LlvmType::Opaque { .. } => panic!(
                "internal consistency error: size queried for {} which has no layout",
                types.display(id)
            ),
        }
    }

    /// Computes the number of bytes between the starts of consecutive values
    /// of the type referenced by `id`, which is the store size rounded up to
    /// the type's alignment.
    ///
    /// # Panics
    ///
    /// - If `id` refers to a type with no in-memory layout, namely void and
    ///   opaque structs.
    #[must_use]
    pub fn alloc_size(&self, types: &TypeTable, id: LlvmTypeId) -> u64 {
        align_up(self.store_size(types, id), self.abi_alignment(types, id))
    }

    /// Computes the byte offsets of each of `fields` within a struct, along
    /// with the struct's total size and alignment, following LLVM's struct
    /// layout algorithm.
    ///
    /// # Panics
    ///
    /// - If any of `fields` refers to a type with no in-memory layout, namely
    ///   void and opaque structs.
    #[must_use]
    pub fn struct_layout(
        &self,
        types: &TypeTable,
        fields: &[LlvmTypeId],
        packed: bool,
    ) -> StructLayout {
        let mut offsets = Vec::with_capacity(fields.len());
        let mut size = 0;
        let mut alignment = if packed {
            1
        } else {
            (self.aggregate_layout.abi_alignment / BYTE_SIZE).max(1)
        };

        for &field in fields {
            let field_alignment = if packed {
                1
            } else {
                self.abi_alignment(types, field)
            };
            alignment = alignment.max(field_alignment);
            size = align_up(size, field_alignment);
            offsets.push(size);
            size += self.alloc_size(types, field);
        }

        StructLayout {
            size: align_up(size, alignment),
            alignment,
            offsets,
        }
    }

    /// Applies the scalar alignment rule to the integer layouts: an exact
    /// size match wins, then the smallest layout wider than the request, then
    /// the widest layout known.
    fn int_alignment(&self, bits: u64) -> u64 {
        let widths = self
            .integer_layouts
            .iter()
            .map(|layout| (layout.size, layout.abi_alignment))
            .collect::<Vec<_>>();
        alignment_for_width(&widths, bits)
    }

    /// Applies the scalar alignment rule to the floating-point layouts.
    fn float_alignment(&self, bits: u64) -> u64 {
        let widths = self
            .float_layouts
            .iter()
            .map(|layout| (layout.size, layout.abi_alignment))
            .collect::<Vec<_>>();
        alignment_for_width(&widths, bits)
    }
}

impl Default for DataLayout {
    fn default() -> Self {
        Self::new("").expect("The empty string was not a valid data layout specification")
    }
}

impl TryFrom<&str> for DataLayout {
    type Error = Error;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for DataLayout {
    type Error = Error;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::new(&value)
    }
}

/// The in-memory placement of one struct's fields, in bytes.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StructLayout {
    /// The total size of the struct, tail padding included.
    pub size: u64,

    /// The alignment of the struct.
    pub alignment: u64,

    /// The byte offset of each field from the start of the struct.
    pub offsets: Vec<u64>,
}

/// Rounds `value` up to the nearest multiple of `alignment`.
fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// Selects the alignment for a scalar of width `bits` from the `(size,
/// alignment)` pairs in `widths`, which must be sorted by size.
fn alignment_for_width(widths: &[(u64, u64)], bits: u64) -> u64 {
    if let Some((_, alignment)) = widths.iter().find(|(size, _)| *size == bits) {
        return alignment.div_ceil(BYTE_SIZE);
    }
    if let Some((_, alignment)) = widths.iter().find(|(size, _)| *size > bits) {
        return alignment.div_ceil(BYTE_SIZE);
    }
    widths
        .last()
        .map(|(_, alignment)| alignment.div_ceil(BYTE_SIZE))
        .expect("internal consistency error: no scalar layouts are known")
}

/// A description of the endianness used when laying out data.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Endianness {
    /// Little-endian (least-significant byte first).
    Little,

    /// Big-endian (most-significant byte first).
    Big,
}

impl Endianness {
    /// Parses the endianness specification part of the data-layout.
    fn parser() -> impl parsing::DLParser<Endianness> {
        choice((
            just("e").to(Endianness::Little),
            just("E").to(Endianness::Big),
        ))
    }
}

/// A description of the mangling scheme used by this module.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Mangling {
    /// The Unix COFF mangling scheme that is still used by Windows' Portable
    /// Executable format.
    COFF,

    /// The Windows x86 COFF mangling scheme.
    COFF86,

    /// The ELF mangling scheme, where private symbols get a `.L` prefix.
    ELF,

    /// The GOFF mangling scheme, where private symbols get an `@` prefix.
    GOFF,

    /// The Mach-O mangling scheme, where private symbols get an `L` prefix
    /// and other symbols get an `_` prefix.
    MachO,

    /// The MIPS mangling scheme, where private symbols get a `$` prefix.
    MIPS,

    /// The XCOFF mangling scheme, where private symbols get an `L..` prefix.
    XCOFF,
}

impl Mangling {
    /// Parses the mangling specification part of the data-layout.
    fn parser() -> impl parsing::DLParser<Mangling> {
        just("m:").ignore_then(choice((
            just("a").to(Mangling::XCOFF),
            just("e").to(Mangling::ELF),
            just("l").to(Mangling::GOFF),
            just("m").to(Mangling::MIPS),
            just("o").to(Mangling::MachO),
            just("w").to(Mangling::COFF),
            just("x").to(Mangling::COFF86),
        )))
    }
}

/// A specification of the pointer layout for this data-layout.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct PointerLayout {
    /// The address space for which the pointer is being specified.
    pub address_space: u64,

    /// The size of the pointer in bits.
    pub size: u64,

    /// The required ABI alignment for the pointer in bits.
    pub abi_alignment: u64,

    /// The preferred alignment for the pointer in bits.
    pub preferred_alignment: u64,

    /// The size of the index used for address calculation, in bits.
    pub index_size: u64,
}

impl PointerLayout {
    /// Parses the pointer layout specification as part of the data layout
    /// string.
    ///
    /// The address space number follows the `p` directly, as in `p270:32:32`,
    /// and defaults to zero when absent.
    #[must_use]
    pub fn parser() -> impl parsing::DLParser<PointerLayout> {
        just("p")
            .ignore_then(parsing::pos_int(10).or_not())
            .then(parsing::field(parsing::pos_int(10)))
            .then(parsing::field(parsing::pos_int(10)))
            .then(parsing::field(parsing::pos_int(10)).or_not())
            .then(parsing::field(parsing::pos_int(10)).or_not())
            .try_map(
                |((((address_space, size), abi_alignment), preferred_alignment), index_size),
                 span| {
                    let address_space = address_space.unwrap_or(0);
                    let preferred_alignment = preferred_alignment.unwrap_or(abi_alignment);
                    let index_size = index_size.unwrap_or(size);
                    if index_size > size {
                        Err(Simple::custom(
                            span,
                            format!(
                                "The requested index size {index_size} is larger than the pointer \
                                 size {size}"
                            ),
                        ))?;
                    };

                    Ok(Self {
                        address_space,
                        size,
                        abi_alignment,
                        preferred_alignment,
                        index_size,
                    })
                },
            )
    }
}

/// A specification of an integer layout for this data-layout.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct IntegerLayout {
    /// The size of the integer in bits.
    pub size: u64,

    /// The required ABI alignment for the integer in bits.
    pub abi_alignment: u64,

    /// The preferred alignment for the integer in bits.
    pub preferred_alignment: u64,
}

impl IntegerLayout {
    /// Parses an integer layout specification as part of the data layout
    /// string.
    #[must_use]
    pub fn parser() -> impl parsing::DLParser<IntegerLayout> {
        just("i")
            .ignore_then(parsing::pos_int(10))
            .then(parsing::field(parsing::pos_int(10)))
            .then(parsing::field(parsing::pos_int(10)).or_not())
            .try_map(|((size, abi_alignment), preferred_alignment), span| {
                let preferred_alignment = preferred_alignment.unwrap_or(abi_alignment);
                if size == BYTE_SIZE && abi_alignment != size {
                    Err(Simple::custom(
                        span,
                        "i8 was not aligned to a byte boundary",
                    ))?;
                }

                Ok(Self {
                    size,
                    abi_alignment,
                    preferred_alignment,
                })
            })
    }
}

/// A specification of a floating-point layout for this data-layout.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct FloatLayout {
    /// The size of the floating-point number in bits.
    pub size: u64,

    /// The required ABI alignment for the floating-point number in bits.
    pub abi_alignment: u64,

    /// The preferred alignment for the floating-point number in bits.
    pub preferred_alignment: u64,
}

impl FloatLayout {
    /// Parses a floating-point layout specification as part of the data
    /// layout string.
    #[must_use]
    pub fn parser() -> impl parsing::DLParser<FloatLayout> {
        just("f")
            .ignore_then(parsing::pos_int(10))
            .then(parsing::field(parsing::pos_int(10)))
            .then(parsing::field(parsing::pos_int(10)).or_not())
            .try_map(|((size, abi_alignment), preferred_alignment), span| {
                let preferred_alignment = preferred_alignment.unwrap_or(abi_alignment);
                if ![16, 32, 64, 80, 128].contains(&size) {
                    Err(Simple::custom(
                        span,
                        format!("{size} is not a valid floating-point size"),
                    ))?;
                }

                Ok(Self {
                    size,
                    abi_alignment,
                    preferred_alignment,
                })
            })
    }
}

/// A specification of the aggregate layout for this data-layout.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct AggregateLayout {
    /// The required ABI alignment for an aggregate, in bits.
    pub abi_alignment: u64,

    /// The preferred alignment for an aggregate, in bits.
    pub preferred_alignment: u64,
}

impl AggregateLayout {
    /// Parses the aggregate layout specification as part of the data layout
    /// string.
    #[must_use]
    pub fn parser() -> impl parsing::DLParser<AggregateLayout> {
        just("a")
            .ignore_then(parsing::pos_int(10))
            .then(parsing::field(parsing::pos_int(10)).or_not())
            .map(|(abi_alignment, preferred_alignment)| {
                let preferred_alignment = preferred_alignment.unwrap_or(abi_alignment);

                Self {
                    abi_alignment,
                    preferred_alignment,
                }
            })
    }
}

/// Utility parsing functions to aid in the parsing of data-layouts but that
/// are not associated directly with any type.
pub mod parsing {
    use chumsky::{
        error::Simple,
        prelude::{choice, filter, just},
        text::int,
        Parser,
    };

    use crate::data_layout::BYTE_SIZE;

    /// Simply to avoid typing out the whole parser type parameter
    /// specification every single time given it only varies in one parameter.
    pub trait DLParser<T>: Parser<char, T, Error = Simple<char>> {}

    /// A blanket impl to make this work, because yay.
    impl<T, U> DLParser<T> for U where U: Parser<char, T, Error = Simple<char>> {}

    /// Parses a field separator.
    #[must_use]
    pub fn field_sep<'a>() -> impl DLParser<&'a str> {
        just(":")
    }

    /// Parses a field, namely a colon followed by something as given by the
    /// `then` parser.
    pub fn field<T>(then: impl DLParser<T>) -> impl DLParser<T> {
        field_sep().ignore_then(then)
    }

    /// Parses a positive integer in the specified `radix`.
    #[must_use]
    pub fn pos_int(radix: u32) -> impl DLParser<u64> {
        int(radix).try_map(|num: String, span| {
            num.parse::<u64>().map_err(|_| {
                Simple::custom(span, format!("Could not parse {num} as a positive integer"))
            })
        })
    }

    /// Parses the stack alignment specification part of the data-layout.
    #[must_use]
    pub fn stack_alignment() -> impl DLParser<u64> {
        just("S").ignore_then(pos_int(10)).validate(|alignment, span, emit| {
            if alignment % BYTE_SIZE != 0 {
                emit(Simple::custom(
                    span,
                    format!("{alignment} must be aligned to a byte offset"),
                ));
            }
            alignment
        })
    }

    /// Parses the segment kinds that have no bearing on struct layout, such
    /// as vector layouts (`v`), function pointer layouts (`F`), native
    /// integer widths (`n`) and address space specifications (`ni`, `P`,
    /// `G`, `A`), without retaining their contents.
    #[must_use]
    pub fn ignored_segment() -> impl DLParser<()> {
        choice((
            just("ni"),
            just("v"),
            just("n"),
            just("Fi"),
            just("Fn"),
            just("P"),
            just("G"),
            just("A"),
        ))
        .ignore_then(
            filter(|c: &char| c.is_ascii_digit() || *c == ':')
                .repeated()
                .at_least(1),
        )
        .ignored()
    }
}

#[cfg(test)]
mod test {
    use chumsky::Parser;

    use crate::{
        data_layout::{
            parsing,
            AggregateLayout,
            DataLayout,
            Endianness,
            FloatLayout,
            IntegerLayout,
            Mangling,
            PointerLayout,
        },
        types::TypeTable,
    };

    #[test]
    fn can_parse_data_layout() {
        let dl_string = "e-m:e-p270:32:32-p272:64:64:64-i64:64-f80:128-n8:16:32:64-S128";

        // It should parse correctly
        let parsed_layout = DataLayout::new(dl_string);
        assert!(parsed_layout.is_ok());

        // Now we can check that the fields have their proper values.
        let layout = parsed_layout.unwrap();

        // Little endian with ELF mangling, and the stack aligned to 128 bits.
        assert_eq!(layout.endianness, Endianness::Little);
        assert_eq!(layout.mangling, Mangling::ELF);
        assert_eq!(layout.stack_alignment, 128);

        // The two non-default address spaces are specified, and the zero
        // address space comes from the defaults.
        assert_eq!(layout.pointer_layouts.len(), 3);
        let default_space = layout.pointer_layout();
        assert_eq!(default_space.size, 64);
        let far_space = layout
            .pointer_layouts
            .iter()
            .find(|l| l.address_space == 270)
            .unwrap();
        assert_eq!(far_space.size, 32);
        assert_eq!(far_space.abi_alignment, 32);
        assert_eq!(far_space.index_size, 32);

        // i64 is aligned to its own width, overriding the default.
        let i64_layout = layout.integer_layouts.iter().find(|l| l.size == 64).unwrap();
        assert_eq!(i64_layout.abi_alignment, 64);
        assert_eq!(i64_layout.preferred_alignment, 64);

        // The 80-bit float layout joins the defaulted ones.
        let f80_layout = layout.float_layouts.iter().find(|l| l.size == 80).unwrap();
        assert_eq!(f80_layout.abi_alignment, 128);
    }

    #[test]
    fn can_parse_data_layout_to_default() {
        let parsed_layout = DataLayout::new("");
        assert!(parsed_layout.is_ok());
        let layout = parsed_layout.unwrap();
        assert_eq!(layout, DataLayout::default());

        assert_eq!(layout.endianness, Endianness::Little);
        assert_eq!(layout.mangling, Mangling::ELF);
        assert_eq!(layout.stack_alignment, 0);
        assert_eq!(layout.pointer_layout().size, 64);
        assert_eq!(layout.integer_layouts.len(), 5);
        let i64_layout = layout.integer_layouts.iter().find(|l| l.size == 64).unwrap();
        assert_eq!(i64_layout.abi_alignment, 32);
        assert_eq!(i64_layout.preferred_alignment, 64);
        assert_eq!(layout.float_layouts.len(), 4);
    }

    #[test]
    fn reports_the_offending_segment() {
        let result = DataLayout::new("e-bogus");
        let Err(clift_errors::load::Error::InvalidDataLayoutSpecification(layout, part)) = result
        else {
            panic!("an invalid segment was accepted");
        };

        assert_eq!(layout, "e-bogus");
        assert_eq!(part, "bogus");
    }

    #[test]
    fn can_parse_endianness() {
        // Failures
        assert!(Endianness::parser().parse("x").is_err());
        assert!(Endianness::parser().parse("").is_err());

        // Successes
        assert_eq!(Endianness::parser().parse("e"), Ok(Endianness::Little));
        assert_eq!(Endianness::parser().parse("E"), Ok(Endianness::Big));
    }

    #[test]
    fn can_parse_mangling() {
        // Failures
        assert!(Mangling::parser().parse("m:").is_err());
        assert!(Mangling::parser().parse("m:q").is_err());

        // Successes
        assert_eq!(Mangling::parser().parse("m:e"), Ok(Mangling::ELF));
        assert_eq!(Mangling::parser().parse("m:o"), Ok(Mangling::MachO));
    }

    #[test]
    fn can_parse_stack_alignment() {
        // Failures
        assert!(parsing::stack_alignment().parse("S").is_err());
        assert!(parsing::stack_alignment().parse("S12").is_err());

        // Successes
        assert_eq!(parsing::stack_alignment().parse("S128"), Ok(128));
        assert_eq!(parsing::stack_alignment().parse("S0"), Ok(0));
    }

    #[test]
    fn can_parse_pointer_layout() {
        // Failures
        assert!(PointerLayout::parser().parse("p").is_err());
        assert!(PointerLayout::parser().parse("p:64").is_err());
        assert!(PointerLayout::parser().parse("p:64:64:64:128").is_err());

        // Successes
        assert_eq!(
            PointerLayout::parser().parse("p:64:64"),
            Ok(PointerLayout {
                address_space:       0,
                size:                64,
                abi_alignment:       64,
                preferred_alignment: 64,
                index_size:          64,
            })
        );
        assert_eq!(
            PointerLayout::parser().parse("p270:32:32"),
            Ok(PointerLayout {
                address_space:       270,
                size:                32,
                abi_alignment:       32,
                preferred_alignment: 32,
                index_size:          32,
            })
        );
    }

    #[test]
    fn can_parse_integer_layout() {
        // Failures
        assert!(IntegerLayout::parser().parse("i").is_err());
        assert!(IntegerLayout::parser().parse("i8:16").is_err());

        // Successes
        assert_eq!(
            IntegerLayout::parser().parse("i32:32"),
            Ok(IntegerLayout {
                size:                32,
                abi_alignment:       32,
                preferred_alignment: 32,
            })
        );
        assert_eq!(
            IntegerLayout::parser().parse("i64:32:64"),
            Ok(IntegerLayout {
                size:                64,
                abi_alignment:       32,
                preferred_alignment: 64,
            })
        );
    }

    #[test]
    fn can_parse_float_layout() {
        // Failures
        assert!(FloatLayout::parser().parse("f24:32").is_err());
        assert!(FloatLayout::parser().parse("f").is_err());

        // Successes
        assert_eq!(
            FloatLayout::parser().parse("f80:128"),
            Ok(FloatLayout {
                size:                80,
                abi_alignment:       128,
                preferred_alignment: 128,
            })
        );
    }

    #[test]
    fn can_parse_aggregate_layout() {
        // Failures
        assert!(AggregateLayout::parser().parse("a").is_err());

        // Successes
        assert_eq!(
            AggregateLayout::parser().parse("a0:64"),
            Ok(AggregateLayout {
                abi_alignment:       0,
                preferred_alignment: 64,
            })
        );
    }

    #[test]
    fn tolerates_segments_that_do_not_affect_layout() {
        // Failures
        assert!(parsing::ignored_segment().parse("q64").is_err());
        assert!(parsing::ignored_segment().parse("n").is_err());

        // Successes
        let segments = [
            "v64:64",
            "v128:128",
            "n8:16:32:64",
            "ni:1",
            "Fi64",
            "Fn32",
            "P1",
            "G2",
            "A5",
        ];
        for segment in segments {
            assert!(
                parsing::ignored_segment().parse(segment).is_ok(),
                "segment {segment} was rejected"
            );
        }

        // A layout string full of them still parses.
        assert!(DataLayout::new("e-m:e-v64:64-Fi64-n8:16:32:64-ni:1-P0-G0-A0").is_ok());
    }

    #[test]
    fn computes_scalar_sizes_and_alignments() {
        let layout = DataLayout::new("e-m:e-i64:64-f80:128-S128").unwrap();
        let mut types = TypeTable::new();
        let i1 = types.int_type(1);
        let i16 = types.int_type(16);
        let i64 = types.int_type(64);
        let f80 = types.float_type(80);
        let i64_ptr = types.pointer_to(i64);

        assert_eq!(layout.store_size(&types, i1), 1);
        assert_eq!(layout.alloc_size(&types, i1), 1);
        assert_eq!(layout.abi_alignment(&types, i16), 2);
        assert_eq!(layout.abi_alignment(&types, i64), 8);
        assert_eq!(layout.store_size(&types, f80), 10);
        assert_eq!(layout.alloc_size(&types, f80), 16);
        assert_eq!(layout.store_size(&types, i64_ptr), 8);
        assert_eq!(layout.abi_alignment(&types, i64_ptr), 8);
    }

    #[test]
    fn computes_struct_layouts() {
        let layout = DataLayout::new("e-m:e-i64:64-S128").unwrap();
        let mut types = TypeTable::new();
        let i8 = types.int_type(8);
        let i32 = types.int_type(32);

        // An Ethernet-header shape: two six-byte addresses and a two-byte
        // type field.
        let i16 = types.int_type(16);
        let mac = types.array_of(i8, 6);
        let ether = layout.struct_layout(&types, &[mac, mac, i16], false);
        assert_eq!(ether.offsets, vec![0, 6, 12]);
        assert_eq!(ether.size, 14);
        assert_eq!(ether.alignment, 2);

        // Padding is inserted to keep fields aligned.
        let padded = layout.struct_layout(&types, &[i8, i32, i8], false);
        assert_eq!(padded.offsets, vec![0, 4, 8]);
        assert_eq!(padded.size, 12);
        assert_eq!(padded.alignment, 4);

        // Packed structs place fields back to back.
        let packed = layout.struct_layout(&types, &[i8, i32, i8], true);
        assert_eq!(packed.offsets, vec![0, 1, 5]);
        assert_eq!(packed.size, 6);
        assert_eq!(packed.alignment, 1);
    }

    #[test]
    fn nested_aggregates_contribute_their_alignment() {
        let layout = DataLayout::default();
        let mut types = TypeTable::new();
        let i8 = types.int_type(8);
        let i32 = types.int_type(32);
        let inner = types.literal_struct(vec![i32, i8], false);

        let outer = layout.struct_layout(&types, &[i8, inner], false);
        assert_eq!(layout.store_size(&types, inner), 8);
        assert_eq!(outer.offsets, vec![0, 4]);
        assert_eq!(outer.size, 12);
        assert_eq!(outer.alignment, 4);
    }
}
