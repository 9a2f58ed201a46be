//! Disassembly artifact attached to a compilation
//!
//! Sprint 8: assembly attachment plumbing
//!
//! Fragua does not disassemble anything itself. An external producer (a GUI
//! feeding hsdis output through its own decoder, for example) builds a
//! [`NativeAssembly`] and hands it to `Compilation::attach_assembly`. The
//! lifecycle model stores and returns the artifact without inspecting it.

/// Disassembled native method: optional header plus instruction blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NativeAssembly {
    header: Option<String>,
    native_address: Option<String>,
    blocks: Vec<AssemblyBlock>,
}

/// One labelled run of instruction lines within a disassembly
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyBlock {
    title: Option<String>,
    instructions: Vec<String>,
}

impl AssemblyBlock {
    /// Create an empty block, optionally labelled (e.g. "[Entry Point]")
    pub fn new(title: Option<String>) -> Self {
        Self {
            title,
            instructions: Vec::new(),
        }
    }

    /// Append one instruction line
    pub fn push_instruction(&mut self, line: impl Into<String>) {
        self.instructions.push(line.into());
    }

    /// Block label, if the producer supplied one
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Instruction lines in emission order
    pub fn instructions(&self) -> &[String] {
        &self.instructions
    }
}

impl NativeAssembly {
    /// Create an empty artifact
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the disassembler's header banner
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    /// Record the native entry address the producer resolved
    pub fn with_native_address(mut self, address: impl Into<String>) -> Self {
        self.native_address = Some(address.into());
        self
    }

    /// Append an instruction block
    pub fn push_block(&mut self, block: AssemblyBlock) {
        self.blocks.push(block);
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn native_address(&self) -> Option<&str> {
        self.native_address.as_deref()
    }

    pub fn blocks(&self) -> &[AssemblyBlock] {
        &self.blocks
    }

    /// Total instruction lines across all blocks
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|block| block.instructions.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_assembly() {
        let assembly = NativeAssembly::new();
        assert!(assembly.header().is_none());
        assert!(assembly.native_address().is_none());
        assert!(assembly.blocks().is_empty());
        assert_eq!(assembly.instruction_count(), 0);
    }

    #[test]
    fn test_builder_and_blocks() {
        let mut entry = AssemblyBlock::new(Some("[Entry Point]".to_string()));
        entry.push_instruction("0x7f3c4c060c60: mov %eax,-0x14000(%rsp)");
        entry.push_instruction("0x7f3c4c060c67: push %rbp");

        let mut body = AssemblyBlock::new(None);
        body.push_instruction("0x7f3c4c060c68: sub $0x10,%rsp");

        let mut assembly = NativeAssembly::new()
            .with_header("Decoding compiled method 0x7f3c4c060b10")
            .with_native_address("0x7f3c4c060c60");
        assembly.push_block(entry);
        assembly.push_block(body);

        assert_eq!(
            assembly.header(),
            Some("Decoding compiled method 0x7f3c4c060b10")
        );
        assert_eq!(assembly.native_address(), Some("0x7f3c4c060c60"));
        assert_eq!(assembly.blocks().len(), 2);
        assert_eq!(assembly.blocks()[0].title(), Some("[Entry Point]"));
        assert_eq!(assembly.blocks()[1].title(), None);
        assert_eq!(assembly.instruction_count(), 3);
    }
}
