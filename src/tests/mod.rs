mod test_codec;
mod test_file;
mod test_filter;
mod test_index;
