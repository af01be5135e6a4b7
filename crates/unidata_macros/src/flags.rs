use proc_macro2::*;
use quote::quote;
use syn::{punctuated::Punctuated, *};

const BASE_TYPES : [(&str, u32); 4] = [("u8", 8), ("u16", 16), ("u32", 32), ("u64", 64)];

struct FlagsArgs {
	base_type       : Option<syn::Ident>,
	parse_from_name : bool,
}

impl syn::parse::Parse for FlagsArgs {
	fn parse(input: parse::ParseStream) -> Result<Self> {
		let list = Punctuated::<syn::Ident, Token![,]>::parse_terminated(input)?;

		let mut args = FlagsArgs { base_type: None, parse_from_name: false };
		for iden in list {
			if BASE_TYPES.iter().any(|(name, _)| iden == *name) {
				if args.base_type.is_some() {
					return Err(Error::new(iden.span(), "Only one base type can be given"));
				}
				args.base_type = Some(iden);
			} else if iden == "parse_from_name" {
				args.parse_from_name = true;
			} else {
				return Err(Error::new(iden.span(), format!("Unknown `flags` argument '{iden}'")));
			}
		}
		Ok(args)
	}
}

pub fn flags(args: TokenStream, input: TokenStream) -> TokenStream {
	match flags_impl(args, input) {
		Ok(toks) => toks,
		Err(err) => err.to_compile_error(),
	}
}

fn flags_impl(args: TokenStream, input: TokenStream) -> Result<TokenStream> {
	let args = parse2::<FlagsArgs>(args)?;
	// While we don't exactly derive anything, `DeriveInput` is close enough to an enum definition
	let input_parsed = parse2::<DeriveInput>(input)?;

	let vis = input_parsed.vis;
	let flag_name = input_parsed.ident;
	let enum_attrs = input_parsed.attrs;

	let body_data = match input_parsed.data {
		Data::Enum(body) => body,
		_ => return Err(Error::new(flag_name.span(), "`flags` can only be used on an enum")),
	};

	let mut idents = Vec::<syn::Ident>::new();
	let mut vals = Vec::<u64>::new();
	let mut attrs = Vec::<Vec<Attribute>>::new();
	let mut parse_names = Vec::<String>::new();

	for variant in body_data.variants {
		let span = variant.ident.span();
		if !matches!(variant.fields, Fields::Unit) {
			return Err(Error::new(span, format!("Member '{}' cannot carry data", variant.ident)));
		}

		let mut parse_name = None;
		let mut elem_attrs = Vec::new();
		for attr in variant.attrs {
			if attr.path().is_ident("parse_name") {
				if parse_name.is_some() {
					return Err(Error::new(span, format!("Duplicate `parse_name` for member '{}'", variant.ident)));
				}
				let lit = attr.parse_args::<LitStr>().map_err(|_| Error::new(span, format!("Expected a string literal as a `parse_name` for member '{}'", variant.ident)))?;
				parse_name = Some(lit.value());
				continue;
			}
			elem_attrs.push(attr);
		}

		let val = match &variant.discriminant {
			Some((_, Expr::Lit(ExprLit { lit: Lit::Int(lit), .. }))) => lit.base10_parse::<u64>()?,
			_ => return Err(Error::new(span, format!("Member '{}' needs an explicit integer bit value", variant.ident))),
		};
		if !val.is_power_of_two() {
			return Err(Error::new(span, format!("Member '{}' has to be a single bit, found {val:#x}", variant.ident)));
		}
		if let Some(idx) = vals.iter().position(|&other| other == val) {
			return Err(Error::new(span, format!("Member '{}' reuses the bit of '{}'", variant.ident, idents[idx])));
		}

		parse_names.push(parse_name.unwrap_or_else(|| variant.ident.to_string()));
		idents.push(variant.ident);
		vals.push(val);
		attrs.push(elem_attrs);
	}

	let max_val = vals.iter().copied().max().unwrap_or(0);
	let base_type = match args.base_type {
		Some(ty) => {
			let bits = BASE_TYPES.iter().find(|(name, _)| ty == *name).map_or(64, |(_, bits)| *bits);
			if bits < 64 && max_val >> bits != 0 {
				return Err(Error::new(ty.span(), format!("Bit {max_val:#x} does not fit in `{ty}`")));
			}
			ty
		},
		None => {
			let name = BASE_TYPES.iter()
				.find(|(_, bits)| *bits == 64 || max_val >> bits == 0)
				.map_or("u64", |(name, _)| *name);
			syn::Ident::new(name, Span::call_site())
		}
	};

	let lits = vals.iter().map(|val| LitInt::new(&format!("{val:#x}"), Span::call_site())).collect::<Vec<_>>();
	let count = idents.len();

	let parse = if args.parse_from_name {
		quote!{
			/// Parse `|`-separated flag names, returns `None` if any of the names is unknown.
			#vis fn parse(name: &str) -> Option<Self> {
				let mut flags = Self::none();
				for sub_name in name.split('|').map(|val| val.trim()) {
					flags |= match sub_name {
						#(#parse_names => Self::#idents,)*
						_ => return None
					}
				}
				Some(flags)
			}
		}
	} else {
		quote!{}
	};

	Ok(quote!(
		#(#enum_attrs)*
		#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
		#[repr(transparent)]
		#vis struct #flag_name {
			bits : #base_type
		}

		#[allow(non_upper_case_globals)]
		impl #flag_name {
			#(#(#attrs)* #vis const #idents : #flag_name = #flag_name { bits: #lits as #base_type };)*

			/// Every flag with its name, in declaration order.
			#vis const FLAGS : [(&'static str, #flag_name); #count] = [#((#parse_names, #flag_name::#idents)),*];

			/// Create flags instance with no flag set.
			#vis const fn none() -> Self {
				Self { bits: 0 }
			}

			/// Create flags instance with all valid flags set.
			#vis const fn all() -> Self {
				Self { bits: 0 #( | #lits as #base_type)* }
			}

			/// Get the flags' bits
			#vis const fn bits(&self) -> #base_type {
				self.bits
			}

			/// Create flags from raw bits, returns `None` when a bit without a flag is set.
			#vis const fn from_bits(bits: #base_type) -> Option<Self> {
				if bits & !Self::all().bits == 0 {
					Some(Self { bits })
				} else {
					None
				}
			}

			/// Create flags from raw bits, dropping any bit without a flag.
			#vis const fn from_bits_truncate(bits: #base_type) -> Self {
				Self { bits: bits & Self::all().bits }
			}

			/// Check if a given flag(s) is/are set (if multiple flags are checked, all flags need to be set).
			#vis const fn contains(&self, flag: #flag_name) -> bool {
				self.bits & flag.bits == flag.bits
			}

			/// Check if any of the given flags are set.
			#vis const fn intersects(&self, flag: #flag_name) -> bool {
				self.bits & flag.bits != 0
			}

			/// Check if no flag is set.
			#vis const fn is_none(&self) -> bool {
				self.bits == 0
			}

			/// Check if any flag is set.
			#vis const fn is_any(&self) -> bool {
				self.bits != 0
			}

			/// Set the state of a given flag to `set`.
			#vis fn set(&mut self, flag: #flag_name, set: bool) {
				if set {
					self.bits |= flag.bits;
				} else {
					self.bits &= !flag.bits;
				}
			}

			/// Enable a given flag.
			#vis fn enable(&mut self, flag: #flag_name) {
				self.bits |= flag.bits;
			}

			/// Disable a given flag.
			#vis fn disable(&mut self, flag: #flag_name) {
				self.bits &= !flag.bits;
			}

			#parse
		}

		impl ::core::ops::Not for #flag_name {
			type Output = Self;
			fn not(self) -> Self {
				Self { bits: !self.bits & Self::all().bits }
			}
		}

		impl ::core::ops::BitAnd for #flag_name {
			type Output = Self;
			fn bitand(self, rhs: Self) -> Self {
				Self { bits: self.bits & rhs.bits }
			}
		}

		impl ::core::ops::BitAndAssign for #flag_name {
			fn bitand_assign(&mut self, rhs: Self) {
				self.bits &= rhs.bits;
			}
		}

		impl ::core::ops::BitOr for #flag_name {
			type Output = Self;
			fn bitor(self, rhs: Self) -> Self {
				Self { bits: self.bits | rhs.bits }
			}
		}

		impl ::core::ops::BitOrAssign for #flag_name {
			fn bitor_assign(&mut self, rhs: Self) {
				self.bits |= rhs.bits;
			}
		}

		impl From<#flag_name> for #base_type {
			fn from(val: #flag_name) -> #base_type {
				val.bits
			}
		}

		impl Default for #flag_name {
			fn default() -> #flag_name {
				#flag_name::none()
			}
		}

		impl ::core::fmt::Debug for #flag_name {
			fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
				if self.is_none() {
					return f.write_str("None");
				}

				let mut started = false;
				for (name, flag) in Self::FLAGS {
					if self.contains(flag) {
						if started {
							f.write_str(" | ")?;
						}
						f.write_str(name)?;
						started = true;
					}
				}
				Ok(())
			}
		}

		impl ::core::fmt::Display for #flag_name {
			fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
				::core::fmt::Debug::fmt(self, f)
			}
		}
	))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn expand(args: TokenStream, input: TokenStream) -> Result<TokenStream> {
		flags_impl(args, input)
	}

	#[test]
	fn accepts_explicit_bits() {
		let res = expand(quote!(parse_from_name), quote!(
			pub enum Bits {
				A = 0x01,
				#[parse_name("b")]
				B = 0x04,
			}
		));
		let toks = res.unwrap().to_string();
		assert!(toks.contains("struct Bits"));
		assert!(toks.contains("fn parse"));
		assert!(toks.contains("u8"));
	}

	#[test]
	fn picks_wider_base_type() {
		let toks = expand(quote!(), quote!(enum Bits { High = 0x100 })).unwrap().to_string();
		assert!(toks.contains("u16"));
	}

	#[test]
	fn rejects_implicit_bits() {
		assert!(expand(quote!(), quote!(enum Bits { A, B })).is_err());
	}

	#[test]
	fn rejects_multi_bit_values() {
		assert!(expand(quote!(), quote!(enum Bits { A = 3 })).is_err());
	}

	#[test]
	fn rejects_reused_bits() {
		assert!(expand(quote!(), quote!(enum Bits { A = 1, B = 1 })).is_err());
	}

	#[test]
	fn rejects_bits_outside_base_type() {
		assert!(expand(quote!(u8), quote!(enum Bits { A = 0x100 })).is_err());
	}

	#[test]
	fn rejects_unknown_arguments() {
		assert!(expand(quote!(sparkles), quote!(enum Bits { A = 1 })).is_err());
	}
}
