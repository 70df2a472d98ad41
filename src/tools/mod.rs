pub mod pdf_reader_tool;
