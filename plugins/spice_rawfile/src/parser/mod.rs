use std::str;

use nom::bytes::complete::take_till1;
use nom::character::complete::{
    char, digit1, line_ending, multispace0, not_line_ending, space0, space1,
};
use nom::combinator::{map, map_res};
use nom::multi::count;
use nom::number::complete::{double, le_f64};
use nom::sequence::{pair, preceded, tuple};
use nom::IResult;
use serde::Serialize;

use crate::{Error, Result};


/// One plot of a rawfile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis<'a> {
    pub title: &'a str,
    pub date: &'a str,
    pub plotname: &'a str,
    pub flags: &'a str,
    pub num_variables: usize,
    pub num_points: usize,
    pub variables: Vec<Variable<'a>>,
    pub data: Data,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct Variable<'a> {
    pub idx: usize,
    pub name: &'a str,
    pub unit: &'a str,
}

/// Plot data, one vector per variable, in variable order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Data {
    Real(Vec<Vec<f64>>),
    Complex(Vec<ComplexVec>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplexVec {
    pub real: Vec<f64>,
    pub imag: Vec<f64>,
}

impl Data {
    #[inline]
    pub fn is_complex(&self) -> bool {
        matches!(self, Self::Complex(_))
    }

    pub fn into_real(self) -> Option<Vec<Vec<f64>>> {
        match self {
            Self::Real(data) => Some(data),
            Self::Complex(_) => None,
        }
    }

    pub fn into_complex(self) -> Option<Vec<ComplexVec>> {
        match self {
            Self::Complex(data) => Some(data),
            Self::Real(_) => None,
        }
    }

    /// # Panics
    ///
    /// Panics if the data is complex.
    pub fn unwrap_real(self) -> Vec<Vec<f64>> {
        match self {
            Self::Real(data) => data,
            Self::Complex(_) => panic!("expected real rawfile data, found complex"),
        }
    }

    /// # Panics
    ///
    /// Panics if the data is real.
    pub fn unwrap_complex(self) -> Vec<ComplexVec> {
        match self {
            Self::Complex(data) => data,
            Self::Real(_) => panic!("expected complex rawfile data, found real"),
        }
    }
}

impl<'a> Analysis<'a> {
    pub fn is_complex(&self) -> bool {
        self.flags.to_ascii_lowercase().contains("complex")
    }

    pub fn variable(&self, name: &str) -> Option<&Variable<'a>> {
        self.variables
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
    }
}

type ParseError<'a> = nom::Err<nom::error::Error<&'a [u8]>>;

fn trimmed_utf8(input: &[u8]) -> std::result::Result<&str, str::Utf8Error> {
    str::from_utf8(input).map(str::trim)
}

fn header_line(input: &[u8]) -> IResult<&[u8], (&str, &str)> {
    let (input, (key, _, value, _)) = tuple((
        map_res(
            take_till1(|c: u8| c == b':' || c == b'\n' || c == b'\r'),
            trimmed_utf8,
        ),
        char(':'),
        map_res(not_line_ending, trimmed_utf8),
        line_ending,
    ))(input)?;
    Ok((input, (key, value)))
}

fn token(input: &[u8]) -> IResult<&[u8], &str> {
    map_res(take_till1(|c: u8| c.is_ascii_whitespace()), str::from_utf8)(input)
}

fn index(input: &[u8]) -> IResult<&[u8], usize> {
    map_res(map_res(digit1, str::from_utf8), str::parse::<usize>)(input)
}

fn variable(input: &[u8]) -> IResult<&[u8], Variable<'_>> {
    // Anything after the unit (e.g. ngspice's `dims=`) is ignored.
    let (input, (_, idx, _, name, _, unit, _, _)) = tuple((
        space0,
        index,
        space1,
        token,
        space1,
        token,
        not_line_ending,
        line_ending,
    ))(input)?;
    Ok((input, Variable { idx, name, unit }))
}

fn ascii_value(complex: bool) -> impl Fn(&[u8]) -> IResult<&[u8], (f64, f64)> {
    move |input| {
        if complex {
            pair(
                preceded(multispace0, double),
                preceded(char(','), double),
            )(input)
        } else {
            map(preceded(multispace0, double), |re| (re, 0.0))(input)
        }
    }
}

fn ascii_point(
    num_variables: usize,
    complex: bool,
) -> impl Fn(&[u8]) -> IResult<&[u8], Vec<(f64, f64)>> {
    move |input| {
        preceded(
            pair(multispace0, index),
            count(ascii_value(complex), num_variables),
        )(input)
    }
}

fn binary_point(
    num_variables: usize,
    complex: bool,
) -> impl Fn(&[u8]) -> IResult<&[u8], Vec<(f64, f64)>> {
    move |input| {
        if complex {
            count(pair(le_f64, le_f64), num_variables)(input)
        } else {
            count(map(le_f64, |re| (re, 0.0)), num_variables)(input)
        }
    }
}

/// Regroups point-major samples into one vector per variable.
fn transpose(points: Vec<Vec<(f64, f64)>>, num_variables: usize, complex: bool) -> Data {
    if complex {
        let mut data = vec![ComplexVec::default(); num_variables];
        for point in points {
            for (var, (re, im)) in data.iter_mut().zip(point) {
                var.real.push(re);
                var.imag.push(im);
            }
        }
        Data::Complex(data)
    } else {
        let mut data = vec![Vec::with_capacity(points.len()); num_variables];
        for point in points {
            for (var, (re, _)) in data.iter_mut().zip(point) {
                var.push(re);
            }
        }
        Data::Real(data)
    }
}

fn offset_of(full: &[u8], rest: &[u8]) -> usize {
    full.len().saturating_sub(rest.len())
}

fn to_error(full: &[u8], err: ParseError<'_>) -> Error {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => Error::Parse {
            offset: offset_of(full, e.input),
            kind: e.code,
        },
        nom::Err::Incomplete(_) => Error::Parse {
            offset: full.len(),
            kind: nom::error::ErrorKind::Eof,
        },
    }
}

fn header_num(key: &str, value: &str) -> Result<usize> {
    value.parse().map_err(|_| Error::Header {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn analysis<'a>(full: &'a [u8], mut input: &'a [u8]) -> Result<(&'a [u8], Analysis<'a>)> {
    let err = |e| to_error(full, e);

    let mut an = Analysis {
        title: "",
        date: "",
        plotname: "",
        flags: "",
        num_variables: 0,
        num_points: 0,
        variables: Vec::new(),
        data: Data::Real(Vec::new()),
    };

    loop {
        let (rest, (key, value)) = header_line(input).map_err(err)?;
        input = rest;

        match key.to_ascii_lowercase().as_str() {
            "title" => an.title = value,
            "date" => an.date = value,
            "plotname" => an.plotname = value,
            "flags" => an.flags = value,
            "no. variables" => an.num_variables = header_num(key, value)?,
            "no. points" => an.num_points = header_num(key, value)?,
            "variables" => {
                let (rest, vars) = count(variable, an.num_variables)(input).map_err(err)?;
                input = rest;
                an.variables = vars;
            }
            section @ ("values" | "binary") => {
                let complex = an.is_complex();
                let result = if section == "values" {
                    count(ascii_point(an.num_variables, complex), an.num_points)(input)
                } else {
                    count(binary_point(an.num_variables, complex), an.num_points)(input)
                };
                let (rest, points) = result.map_err(|e| match e {
                    nom::Err::Error(ref inner) | nom::Err::Failure(ref inner)
                        if inner.code == nom::error::ErrorKind::Eof
                            || inner.input.iter().all(u8::is_ascii_whitespace) =>
                    {
                        Error::Truncated {
                            expected: an.num_points,
                        }
                    }
                    e => to_error(full, e),
                })?;
                an.data = transpose(points, an.num_variables, complex);
                return Ok((rest, an));
            }
            // Headers such as `Command:` and `Option:` carry nothing we need.
            _ => (),
        }
    }
}

pub(crate) fn parse_rawfile(full: &[u8]) -> Result<Vec<Analysis<'_>>> {
    let mut analyses = Vec::new();
    let mut input = full;
    loop {
        let start = input
            .iter()
            .position(|c| !c.is_ascii_whitespace())
            .unwrap_or(input.len());
        input = &input[start..];
        if input.is_empty() {
            break;
        }
        let (rest, an) = analysis(full, input)?;
        analyses.push(an);
        input = rest;
    }

    if analyses.is_empty() {
        return Err(Error::Empty);
    }
    Ok(analyses)
}
