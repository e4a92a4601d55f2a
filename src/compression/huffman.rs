
//! Huffman compression and decompression of quantized symbols.
//! The code tree is persisted next to the bits,
//! so that decoding does not require the original frequencies.

use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    fmt,
};

use smallvec::SmallVec;

use super::bits::{Bits, BitCursor};
use crate::error::{Error, Result, usize_to_u32};
use crate::io::Data;
use crate::math::ceil_log_2;


/// A quantized value, always below the alphabet size.
pub type Symbol = u16;

/// Codes are stored in a `u64`, so the tree must not be deeper than this.
const MAX_CODE_LENGTH: u8 = 64;

/// Largest alphabet a persisted tree may declare.
const MAX_ALPHABET_SIZE: usize = 1 << 16;

const INVALID_TREE_SHAPE: &'static str = "tree ends before all leaves were read";
const TREE_TOO_LONG: &'static str = "tree has trailing data";
const TREE_TOO_DEEP: &'static str = "tree is deeper than the longest supported code";
const NOT_ENOUGH_DATA: &'static str = "bits end before all symbols were decoded";


/// How often each symbol of the alphabet occurs in a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreqStatistics {
    counts: Vec<u64>,
}

impl FreqStatistics {

    /// Statistics of an empty sequence over an alphabet of `alphabet_size` symbols.
    pub fn new(alphabet_size: usize) -> Self {
        Self { counts: vec![0; alphabet_size] }
    }

    /// Count all symbols of the sequence.
    pub fn from_symbols(alphabet_size: usize, symbols: &[Symbol]) -> Result<Self> {
        let mut statistics = Self::new(alphabet_size);
        for &symbol in symbols { statistics.push(symbol)?; }
        Ok(statistics)
    }

    /// Count one more occurrence of the symbol.
    #[inline]
    pub fn push(&mut self, symbol: Symbol) -> Result<()> {
        let alphabet_size = self.counts.len();
        let count = self.counts.get_mut(usize::from(symbol)).ok_or_else(|| Error::out_of_range(
            format!("symbol {} is not in an alphabet of {}", symbol, alphabet_size)
        ))?;

        *count += 1;
        Ok(())
    }

    /// Number of symbols in the alphabet, including those that never occurred.
    pub fn alphabet_size(&self) -> usize { self.counts.len() }

    /// How often the symbol occurred.
    pub fn count(&self, symbol: Symbol) -> u64 {
        self.counts.get(usize::from(symbol)).copied().unwrap_or(0)
    }

    /// Number of counted symbols.
    pub fn total(&self) -> u64 { self.counts.iter().sum() }

    /// Number of symbols that occurred at least once.
    pub fn distinct(&self) -> usize { self.counts.iter().filter(|&&count| count != 0).count() }

    /// All occurring symbols with their frequency,
    /// ascending by frequency, symbols of equal frequency ascending by value.
    pub fn sorted(&self) -> Vec<(Symbol, u64)> {
        let mut sorted: Vec<(Symbol, u64)> = self.counts.iter().enumerate()
            .filter(|&(_, &count)| count != 0)
            .map(|(symbol, &count)| (symbol as Symbol, count))
            .collect();

        // stable, and the input is ordered by symbol
        sorted.sort_by_key(|&(_, count)| count);
        sorted
    }

    /// Build the huffman tree of the occurring symbols.
    /// Fails if no symbol occurred at all.
    pub fn build_tree(&self) -> Result<HuffmanTree> {
        HuffmanTree::from_statistics(self)
    }
}


/// A node of the code tree. Leaves only exist for occurring symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf { symbol: Symbol, frequency: u64 },

    /// The first child is reached with a zero bit, the second with a one bit.
    Internal { frequency: u64, children: Box<[Node; 2]> },
}

impl Node {

    /// Sum of the frequencies of all leaves below this node.
    pub fn frequency(&self) -> u64 {
        match *self {
            Node::Leaf { frequency, .. } => frequency,
            Node::Internal { frequency, .. } => frequency,
        }
    }

    /// Number of edges on the longest path to a leaf.
    pub fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Internal { children, .. } => 1 + children[0].depth().max(children[1].depth()),
        }
    }
}


/// Node with position, used for the min heap.
/// The position makes the tree independent of the heap implementation.
struct HeapNode {
    order: usize,
    node: Node,
}

impl Ord for HeapNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other.node.frequency()
            .cmp(&self.node.frequency())
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for HeapNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapNode {}


/// A prefix-free code of up to 64 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Code {
    /// The lowest `length` bits, the first bit being the most significant one.
    pub bits: u64,
    pub length: u8,
}

impl Code {

    /// This code with one more bit appended.
    fn then(self, bit: bool) -> Result<Self> {
        if self.length >= MAX_CODE_LENGTH {
            return Err(Error::tree_corrupt(TREE_TOO_DEEP));
        }

        Ok(Code { bits: (self.bits << 1) | u64::from(bit), length: self.length + 1 })
    }

    /// Whether all bits of this code start the other code.
    pub fn is_prefix_of(self, other: Code) -> bool {
        self.length <= other.length
            && (self.length == 0 || other.bits >> (other.length - self.length) == self.bits)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.length == 0 { Ok(()) }
        else { write!(formatter, "{:0width$b}", self.bits, width = usize::from(self.length)) }
    }
}


/// Maps each occurring symbol to its code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    codes: Vec<Option<Code>>,
}

impl CodeTable {

    /// The code of the symbol, if the symbol is part of the tree.
    pub fn get(&self, symbol: Symbol) -> Option<Code> {
        self.codes.get(usize::from(symbol)).copied().flatten()
    }

    /// All symbols of the tree with their codes, ascending by symbol.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, Code)> + '_ {
        self.codes.iter().enumerate()
            .filter_map(|(symbol, code)| code.map(|code| (symbol as Symbol, code)))
    }

    /// Append the codes of all symbols to the bits.
    /// Fails with `UnknownSymbol` for symbols without a code.
    pub fn encode(&self, symbols: &[Symbol]) -> Result<Bits> {
        let mut bits = Bits::with_capacity(symbols.len());

        for &symbol in symbols {
            let code = self.get(symbol).ok_or_else(|| Error::unknown_symbol(
                format!("symbol {} is not part of the tree", symbol)
            ))?;

            bits.push_bits(code.bits, code.length);
        }

        Ok(bits)
    }
}

impl fmt::Display for CodeTable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (symbol, code) in self.iter() {
            writeln!(formatter, "{}\t{}", symbol, code)?;
        }

        Ok(())
    }
}


/// The tree of a huffman code over an alphabet of `0 .. alphabet_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTree {
    alphabet_size: usize,
    root: Node,
}

impl HuffmanTree {

    /// Repeatedly combine the two least frequent nodes,
    /// starting with the leaves sorted by frequency and symbol.
    pub fn from_statistics(statistics: &FreqStatistics) -> Result<Self> {
        let sorted = statistics.sorted();
        log::trace!("sorted frequencies: {:?}", sorted);

        let mut heap: BinaryHeap<HeapNode> = sorted.iter().enumerate()
            .map(|(order, &(symbol, frequency))| HeapNode {
                order, node: Node::Leaf { symbol, frequency }
            })
            .collect();

        let mut next_order = heap.len();

        let root = loop {
            let smallest = heap.pop().ok_or_else(|| Error::unquantizable("cannot build a tree without symbols"))?;

            let second = match heap.pop() {
                Some(second) => second,
                None => break smallest.node,
            };

            let frequency = smallest.node.frequency() + second.node.frequency();
            heap.push(HeapNode {
                order: next_order,
                node: Node::Internal { frequency, children: Box::new([smallest.node, second.node]) },
            });

            next_order += 1;
        };

        Ok(HuffmanTree { alphabet_size: statistics.alphabet_size(), root })
    }

    /// The number of symbols this tree was built for.
    pub fn alphabet_size(&self) -> usize { self.alphabet_size }

    /// The top node.
    pub fn root(&self) -> &Node { &self.root }

    /// Walk the tree depth first, appending a zero bit for the first child
    /// and a one bit for the second child.
    /// A tree that consists of a single leaf assigns the code `0` to it.
    pub fn code_table(&self) -> Result<CodeTable> {
        let mut codes = vec![None; self.alphabet_size];
        let mut stack: SmallVec<[(&Node, Code); 64]> = SmallVec::new();

        match &self.root {
            Node::Leaf { .. } => stack.push((&self.root, Code { bits: 0, length: 1 })),
            root => stack.push((root, Code::default())),
        }

        while let Some((node, code)) = stack.pop() {
            match node {
                Node::Leaf { symbol, .. } => {
                    let entry = codes.get_mut(usize::from(*symbol))
                        .ok_or_else(|| Error::tree_corrupt("leaf symbol is outside of the alphabet"))?;

                    *entry = Some(code);
                },

                Node::Internal { children, .. } => {
                    stack.push((&children[1], code.then(true)?));
                    stack.push((&children[0], code.then(false)?));
                },
            }
        }

        let table = CodeTable { codes };
        log::trace!("code table:\n{}", table);
        Ok(table)
    }

    /// Number of bits used to store a symbol in the persisted tree.
    fn symbol_bit_count(alphabet_size: usize) -> u8 {
        ceil_log_2(alphabet_size as u32) as u8
    }

    /// Persist the shape and the leaf symbols of this tree.
    /// Starts with the alphabet size, followed by the nodes in pre-order:
    /// a one bit and the symbol for leaves, a zero bit for internal nodes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let symbol_bits = Self::symbol_bit_count(self.alphabet_size);
        let mut bits = Bits::new();
        let mut stack: SmallVec<[&Node; 64]> = SmallVec::new();
        stack.push(&self.root);

        while let Some(node) = stack.pop() {
            match node {
                Node::Leaf { symbol, .. } => {
                    bits.push(true);
                    bits.push_bits(u64::from(*symbol), symbol_bits);
                },

                Node::Internal { children, .. } => {
                    bits.push(false);
                    stack.push(&children[1]);
                    stack.push(&children[0]);
                },
            }
        }

        let mut bytes = Vec::with_capacity(4 + bits.as_bytes().len());
        usize_to_u32(self.alphabet_size, "alphabet too large")?.write(&mut bytes)?;
        bytes.extend_from_slice(bits.as_bytes());
        Ok(bytes)
    }

    /// Parse a tree that was persisted with `to_bytes`.
    /// Leaves have no frequency after parsing.
    pub fn from_bytes(mut bytes: &[u8]) -> Result<Self> {
        let alphabet_size = u32::read(&mut bytes)
            .map_err(|_| Error::tree_corrupt("missing alphabet size"))? as usize;

        if alphabet_size == 0 || alphabet_size > MAX_ALPHABET_SIZE {
            return Err(Error::tree_corrupt(format!("invalid alphabet size {}", alphabet_size)));
        }

        let bits = Bits::from_bytes(bytes.to_vec(), bytes.len() * 8)?;
        let mut cursor = bits.cursor();
        let mut seen = vec![false; alphabet_size];

        let root = Self::read_node(&mut cursor, alphabet_size, &mut seen, 0)?;

        // only the zero padding of the last byte may follow
        if cursor.remaining() >= 8 {
            return Err(Error::tree_corrupt(TREE_TOO_LONG));
        }

        Ok(HuffmanTree { alphabet_size, root })
    }

    fn read_node(cursor: &mut BitCursor<'_>, alphabet_size: usize, seen: &mut [bool], depth: u8) -> Result<Node> {
        if depth > MAX_CODE_LENGTH {
            return Err(Error::tree_corrupt(TREE_TOO_DEEP));
        }

        let is_leaf = cursor.read_bit().ok_or_else(|| Error::tree_corrupt(INVALID_TREE_SHAPE))?;

        if is_leaf {
            let symbol = cursor.read_bits(Self::symbol_bit_count(alphabet_size))
                .ok_or_else(|| Error::tree_corrupt(INVALID_TREE_SHAPE))? as usize;

            match seen.get_mut(symbol) {
                None => Err(Error::tree_corrupt(format!("symbol {} is outside of the alphabet", symbol))),
                Some(true) => Err(Error::tree_corrupt(format!("symbol {} appears twice", symbol))),
                Some(seen) => {
                    *seen = true;
                    Ok(Node::Leaf { symbol: symbol as Symbol, frequency: 0 })
                }
            }
        }
        else {
            let zero = Self::read_node(cursor, alphabet_size, seen, depth + 1)?;
            let one = Self::read_node(cursor, alphabet_size, seen, depth + 1)?;
            Ok(Node::Internal { frequency: 0, children: Box::new([zero, one]) })
        }
    }

    /// Decode exactly `count` symbols, ignoring any bits after them.
    ///
    /// Bits are accumulated until they form a complete code.
    /// A bit sequence that is not the start of any code fails with `UnknownSymbol`,
    /// running out of bits fails with `Invalid`.
    pub fn decode(&self, bits: &Bits, count: usize) -> Result<Vec<Symbol>> {
        let mut output = Vec::with_capacity(count.min(bits.len()));
        let mut cursor = bits.cursor();

        let mut node = &self.root;
        let mut accumulated = Code::default();

        while output.len() < count {
            let bit = cursor.read_bit().ok_or_else(|| Error::invalid(NOT_ENOUGH_DATA))?;
            accumulated = accumulated.then(bit)?;

            node = match node {
                // a single leaf is encoded as a single zero bit
                Node::Leaf { .. } if bit => return Err(Error::unknown_symbol(format!(
                    "the bits {} do not start any code", accumulated
                ))),

                Node::Leaf { .. } => node,
                Node::Internal { children, .. } => &children[usize::from(bit)],
            };

            if let Node::Leaf { symbol, .. } = node {
                output.push(*symbol);
                node = &self.root;
                accumulated = Code::default();
            }
        }

        Ok(output)
    }
}


/// Build the tree for the symbols and encode them.
/// Returns the persisted tree and the bits.
pub fn compress(alphabet_size: usize, symbols: &[Symbol]) -> Result<(Vec<u8>, Bits)> {
    let tree = FreqStatistics::from_symbols(alphabet_size, symbols)?.build_tree()?;
    let bits = tree.code_table()?.encode(symbols)?;
    Ok((tree.to_bytes()?, bits))
}

/// Parse the persisted tree and decode `count` symbols from the bits.
pub fn decompress(tree: &[u8], bits: &Bits, count: usize) -> Result<Vec<Symbol>> {
    HuffmanTree::from_bytes(tree)?.decode(bits, count)
}


#[cfg(test)]
mod test {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    fn fill(random: &mut impl Rng, alphabet_size: u16, size: usize) -> Vec<Symbol> {
        // skewed distribution, to get codes of different lengths
        (0 .. size)
            .map(|_| {
                let value: f32 = random.random::<f32>().powi(3);
                ((value * f32::from(alphabet_size)) as Symbol).min(alphabet_size - 1)
            })
            .collect()
    }

    #[test]
    fn sorted_breaks_ties_by_symbol(){
        let statistics = FreqStatistics::from_symbols(6, &[5, 1, 1, 3, 0, 3, 4]).unwrap();
        assert_eq!(statistics.sorted(), vec![(0, 1), (4, 1), (5, 1), (1, 2), (3, 2)]);
        assert_eq!(statistics.total(), 7);
        assert_eq!(statistics.distinct(), 5);
        assert_eq!(statistics.count(2), 0);
    }

    #[test]
    fn rejects_symbols_outside_alphabet(){
        assert!(matches!(FreqStatistics::from_symbols(4, &[0, 4]), Err(Error::OutOfRange(_))));
    }

    #[test]
    fn known_tree(){
        // a:1 b:1 c:2 d:4 produces the code lengths 3, 3, 2, 1
        let statistics = FreqStatistics::from_symbols(4, &[0, 1, 2, 2, 3, 3, 3, 3]).unwrap();
        let tree = statistics.build_tree().unwrap();
        assert_eq!(tree.root().frequency(), 8);
        assert_eq!(tree.root().depth(), 3);

        let table = tree.code_table().unwrap();
        assert_eq!(table.get(0).unwrap().to_string(), "110");
        assert_eq!(table.get(1).unwrap().to_string(), "111");
        assert_eq!(table.get(2).unwrap().to_string(), "10");
        assert_eq!(table.get(3).unwrap().to_string(), "0");
    }

    #[test]
    fn zero_frequency_symbols_are_absent(){
        let tree = FreqStatistics::from_symbols(32, &[3, 7, 7]).unwrap().build_tree().unwrap();
        let table = tree.code_table().unwrap();
        assert_eq!(table.iter().map(|(symbol, _)| symbol).collect::<Vec<_>>(), vec![3, 7]);
        assert!(table.get(4).is_none());
        assert!(matches!(table.encode(&[3, 4]), Err(Error::UnknownSymbol(_))));
    }

    #[test]
    fn prefix_free(){
        let mut random = StdRng::seed_from_u64(7);
        let symbols = fill(&mut random, 64, 5000);
        let table = FreqStatistics::from_symbols(64, &symbols).unwrap()
            .build_tree().unwrap().code_table().unwrap();

        let codes: Vec<Code> = table.iter().map(|(_, code)| code).collect();
        assert!(codes.len() > 10);

        for (index, &code) in codes.iter().enumerate() {
            for (other_index, &other) in codes.iter().enumerate() {
                if index != other_index {
                    assert!(!code.is_prefix_of(other), "{} is a prefix of {}", code, other);
                }
            }
        }
    }

    #[test]
    fn single_symbol(){
        let symbols = vec![9; 17];
        let (tree, bits) = compress(32, &symbols).unwrap();
        assert_eq!(bits.len(), 17);
        assert!(bits.iter().all(|bit| !bit));

        assert_eq!(decompress(&tree, &bits, symbols.len()).unwrap(), symbols);

        let invalid: Bits = [false, true].iter().copied().collect();
        assert!(matches!(decompress(&tree, &invalid, 2), Err(Error::UnknownSymbol(_))));
    }

    #[test]
    fn tree_survives_persistence(){
        let symbols = [0, 1, 2, 2, 3, 3, 3, 3, 31, 17];
        let tree = FreqStatistics::from_symbols(32, &symbols).unwrap().build_tree().unwrap();
        let parsed = HuffmanTree::from_bytes(&tree.to_bytes().unwrap()).unwrap();

        assert_eq!(parsed.alphabet_size(), 32);
        assert_eq!(parsed.code_table().unwrap(), tree.code_table().unwrap());
    }

    #[test]
    fn round_trip(){
        let mut random = StdRng::seed_from_u64(1234);

        for &alphabet_size in &[1_u16, 2, 3, 32, 255, 4096] {
            let symbols = fill(&mut random, alphabet_size, 10_000);
            let (tree, bits) = compress(usize::from(alphabet_size), &symbols).unwrap();
            let decoded = decompress(&tree, &bits, symbols.len()).unwrap();
            assert_eq!(decoded, symbols);
        }
    }

    #[test]
    fn trailing_bits_are_ignored(){
        let symbols = [1, 0, 1, 1, 2];
        let (tree, mut bits) = compress(3, &symbols).unwrap();
        bits.push_bits(0b1011, 4);

        assert_eq!(decompress(&tree, &bits, symbols.len()).unwrap(), symbols.to_vec());
        assert_eq!(decompress(&tree, &bits, 2).unwrap(), vec![1, 0]);
    }

    #[test]
    fn missing_bits(){
        let symbols = [1, 0, 1, 1, 2];
        let (tree, bits) = compress(3, &symbols).unwrap();
        assert!(matches!(decompress(&tree, &bits, symbols.len() + 1), Err(Error::Invalid(_))));
    }

    #[test]
    fn corrupt_trees(){
        let (tree, _) = compress(32, &[1, 2, 3, 3]).unwrap();

        // truncated
        assert!(matches!(HuffmanTree::from_bytes(&tree[.. 5]), Err(Error::TreeCorrupt(_))));
        assert!(matches!(HuffmanTree::from_bytes(&tree[.. 2]), Err(Error::TreeCorrupt(_))));

        // trailing bytes
        let mut long = tree.clone();
        long.push(0);
        assert!(matches!(HuffmanTree::from_bytes(&long), Err(Error::TreeCorrupt(_))));

        // zero alphabet
        let mut empty_alphabet = tree.clone();
        empty_alphabet[.. 4].copy_from_slice(&[0, 0, 0, 0]);
        assert!(matches!(HuffmanTree::from_bytes(&empty_alphabet), Err(Error::TreeCorrupt(_))));

        // alphabet of two with a single symbol bit, leaf symbols 1 and 1 twice
        let duplicate = [2, 0, 0, 0, 0b0111_0000];
        assert!(matches!(HuffmanTree::from_bytes(&duplicate), Err(Error::TreeCorrupt(_))));

        // alphabet of three with two symbol bits, leaf symbol 3
        let outside = [3, 0, 0, 0, 0b1110_0000];
        assert!(matches!(HuffmanTree::from_bytes(&outside), Err(Error::TreeCorrupt(_))));
    }

    #[test]
    fn empty_input_has_no_tree(){
        assert!(matches!(compress(8, &[]), Err(Error::UnquantizableInput(_))));
    }
}
