mod parse_shapes;
