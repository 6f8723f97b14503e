use std::collections::HashMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use anyhow::{anyhow, Result};
use lazy_static::lazy_static;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Element {
    H,
    Li,
    B,
    C,
    N,
    O,
    F,
    Na,
    Mg,
    Al,
    Si,
    P,
    S,
    Cl,
    K,
    Ca,
    Cr,
    Mn,
    Fe,
    Co,
    Ni,
    Cu,
    Zn,
    Ge,
    As,
    Se,
    Br,
    Pd,
    Ag,
    Sn,
    Sb,
    Te,
    I,
    Cs,
    Pt,
    Au,
    Hg,
    Pb,
    Bi,
}

/// Symbol and atomic number of every supported element.
const ELEMENT_TABLE: &[(Element, &str, u8)] = &[
    (Element::H, "H", 1),
    (Element::Li, "Li", 3),
    (Element::B, "B", 5),
    (Element::C, "C", 6),
    (Element::N, "N", 7),
    (Element::O, "O", 8),
    (Element::F, "F", 9),
    (Element::Na, "Na", 11),
    (Element::Mg, "Mg", 12),
    (Element::Al, "Al", 13),
    (Element::Si, "Si", 14),
    (Element::P, "P", 15),
    (Element::S, "S", 16),
    (Element::Cl, "Cl", 17),
    (Element::K, "K", 19),
    (Element::Ca, "Ca", 20),
    (Element::Cr, "Cr", 24),
    (Element::Mn, "Mn", 25),
    (Element::Fe, "Fe", 26),
    (Element::Co, "Co", 27),
    (Element::Ni, "Ni", 28),
    (Element::Cu, "Cu", 29),
    (Element::Zn, "Zn", 30),
    (Element::Ge, "Ge", 32),
    (Element::As, "As", 33),
    (Element::Se, "Se", 34),
    (Element::Br, "Br", 35),
    (Element::Pd, "Pd", 46),
    (Element::Ag, "Ag", 47),
    (Element::Sn, "Sn", 50),
    (Element::Sb, "Sb", 51),
    (Element::Te, "Te", 52),
    (Element::I, "I", 53),
    (Element::Cs, "Cs", 55),
    (Element::Pt, "Pt", 78),
    (Element::Au, "Au", 79),
    (Element::Hg, "Hg", 80),
    (Element::Pb, "Pb", 82),
    (Element::Bi, "Bi", 83),
];

lazy_static! {
    static ref SYMBOLS: HashMap<&'static str, Element> = ELEMENT_TABLE
        .iter()
        .map(|&(element, symbol, _)| (symbol, element))
        .collect();
}

impl Element {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        SYMBOLS.get(symbol).copied()
    }

    pub fn symbol(&self) -> &'static str {
        self.entry().1
    }

    pub fn atomic_number(&self) -> u8 {
        self.entry().2
    }

    fn entry(&self) -> &'static (Element, &'static str, u8) {
        // Every variant has a row in the table.
        ELEMENT_TABLE
            .iter()
            .find(|(element, _, _)| element == self)
            .unwrap_or(&ELEMENT_TABLE[0])
    }

    /// Normal valences of the SMILES organic subset. Atoms outside the subset
    /// have no implicit hydrogens.
    pub fn default_valences(&self) -> &'static [u32] {
        match self {
            Element::B => &[3],
            Element::C => &[4],
            Element::N => &[3, 5],
            Element::O => &[2],
            Element::P => &[3, 5],
            Element::S => &[2, 4, 6],
            Element::F | Element::Cl | Element::Br | Element::I => &[1],
            _ => &[],
        }
    }

    /// Whether the element may be written without brackets in SMILES.
    pub fn is_organic_subset(&self) -> bool {
        !self.default_valences().is_empty()
    }

    /// Whether the element may appear as a lowercase aromatic symbol.
    pub fn can_be_aromatic(&self) -> bool {
        matches!(
            self,
            Element::B | Element::C | Element::N | Element::O | Element::P
                | Element::S | Element::As | Element::Se | Element::Te
        )
    }

    /// Parse a SMILES element symbol, returning the element and whether the
    /// symbol was written in aromatic (lowercase) form.
    pub fn from_smiles(symbol: &str) -> Result<(Self, bool)> {
        if let Some(element) = Element::from_symbol(symbol) {
            return Ok((element, false));
        }
        let mut chars = symbol.chars();
        let capitalized: String = match chars.next() {
            Some(first) if first.is_ascii_lowercase() => {
                first.to_ascii_uppercase().to_string() + chars.as_str()
            }
            _ => return Err(anyhow!("Unknown element symbol: {}", symbol)),
        };
        match Element::from_symbol(&capitalized) {
            Some(element) if element.can_be_aromatic() => Ok((element, true)),
            _ => Err(anyhow!("Unknown element symbol: {}", symbol)),
        }
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        write!(f, "{}", self.symbol())
    }
}

/// An atom of a [`crate::MoleculeGraph`].
///
/// `hydrogens` holds the hydrogen count written inside brackets; atoms written
/// without brackets leave it unset and get their implicit hydrogens from the
/// element's default valence. `atom_map` is the reaction atom-mapping number,
/// `0` when the atom is unmapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Atom {
    pub element: Element,
    pub aromatic: bool,
    pub charge: i8,
    pub isotope: u16,
    pub hydrogens: Option<u8>,
    pub atom_map: u32,
}

impl Atom {
    pub fn new(element: Element) -> Self {
        Atom {
            element,
            aromatic: false,
            charge: 0,
            isotope: 0,
            hydrogens: None,
            atom_map: 0,
        }
    }

    pub fn aromatic(element: Element) -> Self {
        Atom {
            aromatic: true,
            ..Atom::new(element)
        }
    }

    pub fn with_hydrogens(mut self, hydrogens: u8) -> Self {
        self.hydrogens = Some(hydrogens);
        self
    }

    pub fn is_aromatic(&self) -> bool {
        self.aromatic
    }

    pub fn is_hydrogen(&self) -> bool {
        self.element == Element::H
    }

    /// The element symbol as it appears in SMILES, lowercase when aromatic.
    pub fn smiles_symbol(&self) -> String {
        if self.aromatic {
            self.element.symbol().to_ascii_lowercase()
        } else {
            self.element.symbol().to_string()
        }
    }

    /// Whether the atom has to be written as a bracket atom.
    pub fn needs_brackets(&self) -> bool {
        !self.element.is_organic_subset()
            || self.atom_map != 0
            || self.charge != 0
            || self.isotope != 0
            || self.hydrogens.is_some()
    }

    /// Implicit hydrogen count for an atom with the given sum of bond orders.
    ///
    /// Bracket atoms report their written count. Aromatic atoms reserve one
    /// valence for the ring's pi system.
    pub fn hydrogen_count(&self, bond_order_sum: u32) -> u32 {
        if let Some(hydrogens) = self.hydrogens {
            return hydrogens as u32;
        }
        let valences = self.element.default_valences();
        if self.aromatic {
            return valences
                .first()
                .map_or(0, |&v| v.saturating_sub(bond_order_sum + 1));
        }
        valences
            .iter()
            .find(|&&v| v >= bond_order_sum)
            .map_or(0, |&v| v - bond_order_sum)
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        if self.atom_map != 0 {
            write!(f, "{}:{}", self.element, self.atom_map)
        } else {
            write!(f, "{}", self.element)
        }
    }
}
