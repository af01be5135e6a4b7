use proc_macro::TokenStream;

mod flags;

/// Turn a fieldless enum into a set of bit flags.
///
/// Every member needs an explicit single-bit discriminant, so the bit layout is a fixed table:
/// adding a flag means adding a new bit, never renumbering an existing one.
///
/// Arguments (all optional, comma separated):
/// - `u8`, `u16`, `u32` or `u64`: the backing integer, the smallest one that fits is used otherwise
/// - `parse_from_name`: generate `parse(&str)`, which accepts `|`-separated member names
///
/// Members can override the name used by `parse` and `FLAGS` with `#[parse_name("...")]`.
#[proc_macro_attribute]
pub fn flags(args: TokenStream, input: TokenStream) -> TokenStream {
    flags::flags(args.into(), input.into()).into()
}
